use std::sync::mpsc;
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;
use weatherjournal_core::contract::{
    with_appended_id, COLUMN_LOCATION, COLUMN_NOTES, COLUMN_TEMPERATURE,
};
use weatherjournal_core::{ChangeObserver, ContentValues, Selection, StoreConfig, WeatherStore};

fn store() -> WeatherStore {
    WeatherStore::open(&StoreConfig::in_memory()).unwrap()
}

fn entry(location: &str) -> ContentValues {
    let mut values = ContentValues::new();
    values
        .put_text(COLUMN_LOCATION, location)
        .put(COLUMN_TEMPERATURE, 21.0);
    values
}

fn notes(text: &str) -> ContentValues {
    let mut values = ContentValues::new();
    values.put_text(COLUMN_NOTES, text);
    values
}

#[derive(Default)]
struct RecordingObserver {
    seen: Mutex<Vec<String>>,
}

impl ChangeObserver for RecordingObserver {
    fn on_change(&self, uri: &str) {
        self.seen.lock().unwrap().push(uri.to_string());
    }
}

/// Re-reads the store from inside the callback, the way a list view refreshes.
struct RequeryingObserver {
    store: Weak<WeatherStore>,
    counts: Mutex<Vec<usize>>,
}

impl ChangeObserver for RequeryingObserver {
    fn on_change(&self, uri: &str) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let rows = store
            .query(uri, None, &Selection::all(), None)
            .unwrap()
            .len();
        self.counts.lock().unwrap().push(rows);
    }
}

/// Writes a follow-up entry for the first change it sees.
struct FollowUpWriter {
    store: Weak<WeatherStore>,
    written: Mutex<bool>,
}

impl ChangeObserver for FollowUpWriter {
    fn on_change(&self, uri: &str) {
        let mut written = self.written.lock().unwrap();
        if *written {
            return;
        }
        *written = true;
        drop(written);
        if let Some(store) = self.store.upgrade() {
            store.insert(uri, &entry("follow-up")).unwrap();
        }
    }
}

struct PanickingObserver;

impl ChangeObserver for PanickingObserver {
    fn on_change(&self, _uri: &str) {
        panic!("observer failed");
    }
}

/// Whether `write`, run on a worker thread, returns within `timeout`.
fn finishes_within(timeout: Duration, write: impl FnOnce() + Send + 'static) -> bool {
    let (done, finished) = mpsc::channel();
    thread::spawn(move || {
        write();
        let _ = done.send(());
    });
    finished.recv_timeout(timeout).is_ok()
}

#[test]
fn insert_notifies_collection_observer_once() {
    let store = store();
    let collection = store.collection_uri();
    let subscription = store.notifier().subscribe(&collection, false);

    store.insert(&collection, &entry("Kannur")).unwrap();

    let events = subscription.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].uri, collection);
}

#[test]
fn rejected_insert_does_not_notify() {
    let store = store();
    let collection = store.collection_uri();
    let subscription = store.notifier().subscribe(&collection, true);

    store
        .insert(&collection, &ContentValues::new())
        .unwrap_err();

    assert!(subscription.try_next().is_none());
}

#[test]
fn zero_row_mutations_do_not_notify() {
    let store = store();
    let collection = store.collection_uri();
    let subscription = store.notifier().subscribe(&collection, true);
    let missing = with_appended_id(&collection, 7);

    assert_eq!(
        store
            .update(&missing, &notes("none"), &Selection::all())
            .unwrap(),
        0
    );
    assert_eq!(store.delete(&missing, &Selection::all()).unwrap(), 0);
    assert_eq!(store.delete(&collection, &Selection::all()).unwrap(), 0);

    assert!(subscription.drain().is_empty());
}

#[test]
fn item_changes_reach_descendant_observers_only() {
    let store = store();
    let collection = store.collection_uri();
    let item = store.insert(&collection, &entry("Kannur")).unwrap();

    let with_descendants = store.notifier().subscribe(&collection, true);
    let exact_only = store.notifier().subscribe(&collection, false);
    let item_observer = store.notifier().subscribe(&item, false);

    assert_eq!(
        store.update(&item, &notes("breezy"), &Selection::all()).unwrap(),
        1
    );

    let events = with_descendants.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].uri, item);
    assert!(exact_only.drain().is_empty());
    assert_eq!(item_observer.drain().len(), 1);
}

#[test]
fn collection_change_reaches_item_observers() {
    let store = store();
    let collection = store.collection_uri();
    let item = store.insert(&collection, &entry("Kannur")).unwrap();
    let item_observer = store.notifier().subscribe(&item, false);

    assert_eq!(store.delete(&collection, &Selection::all()).unwrap(), 1);

    let events = item_observer.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].uri, collection);
}

#[test]
fn callback_observers_and_unregister() {
    let store = store();
    let collection = store.collection_uri();
    let observer = Arc::new(RecordingObserver::default());
    let id = store.notifier().register(&collection, true, observer.clone());

    let item = store.insert(&collection, &entry("Kannur")).unwrap();
    store.delete(&item, &Selection::all()).unwrap();
    assert_eq!(
        *observer.seen.lock().unwrap(),
        vec![collection.clone(), item.clone()]
    );

    assert!(store.notifier().unregister(id));
    assert!(!store.notifier().unregister(id));
    store.insert(&collection, &entry("Oslo")).unwrap();
    assert_eq!(observer.seen.lock().unwrap().len(), 2);
}

#[test]
fn reset_notifies_collection() {
    let store = store();
    let collection = store.collection_uri();
    store.insert(&collection, &entry("Kannur")).unwrap();
    let subscription = store.notifier().subscribe(&collection, false);

    store.reset().unwrap();

    assert_eq!(subscription.drain().len(), 1);
}

#[test]
fn dropped_subscriptions_are_pruned() {
    let store = store();
    let collection = store.collection_uri();
    let subscription = store.notifier().subscribe(&collection, false);
    assert_eq!(store.notifier().observer_count(), 1);

    drop(subscription);
    store.insert(&collection, &entry("Kannur")).unwrap();

    assert_eq!(store.notifier().observer_count(), 0);
}

#[test]
fn store_is_shared_across_threads() {
    let store = Arc::new(store());
    let collection = store.collection_uri();
    let subscription = store.notifier().subscribe(&collection, false);

    let writers: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            let collection = collection.clone();
            thread::spawn(move || {
                for index in 0..5 {
                    store
                        .insert(&collection, &entry(&format!("city-{worker}-{index}")))
                        .unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let cursor = store
        .query(&collection, None, &Selection::all(), None)
        .unwrap();
    assert_eq!(cursor.len(), 20);

    let mut received = 0;
    while subscription
        .next_timeout(Duration::from_millis(100))
        .is_some()
    {
        received += 1;
    }
    assert_eq!(received, 20);
}

#[test]
fn observer_can_query_the_store_from_its_callback() {
    let store = Arc::new(store());
    let collection = store.collection_uri();
    let observer = Arc::new(RequeryingObserver {
        store: Arc::downgrade(&store),
        counts: Mutex::new(Vec::new()),
    });
    store.notifier().register(&collection, true, observer.clone());

    let writer = Arc::clone(&store);
    let uri = collection.clone();
    assert!(finishes_within(Duration::from_secs(3), move || {
        writer.insert(&uri, &entry("Kannur")).unwrap();
        writer.insert(&uri, &entry("Oslo")).unwrap();
    }));

    assert_eq!(*observer.counts.lock().unwrap(), vec![1, 2]);
}

#[test]
fn observer_can_write_to_the_store_from_its_callback() {
    let store = Arc::new(store());
    let collection = store.collection_uri();
    let subscription = store.notifier().subscribe(&collection, false);
    store.notifier().register(
        &collection,
        false,
        Arc::new(FollowUpWriter {
            store: Arc::downgrade(&store),
            written: Mutex::new(false),
        }),
    );

    let writer = Arc::clone(&store);
    let uri = collection.clone();
    assert!(finishes_within(Duration::from_secs(3), move || {
        writer.insert(&uri, &entry("Kannur")).unwrap();
    }));

    let locations: Vec<String> = store
        .query(&collection, None, &Selection::all(), None)
        .unwrap()
        .map(|record| record.get_text("location").unwrap().to_string())
        .collect();
    assert_eq!(locations, ["Kannur", "follow-up"]);
    assert_eq!(subscription.drain().len(), 2);
}

#[test]
fn panicking_observer_leaves_store_usable() {
    let store = Arc::new(store());
    let collection = store.collection_uri();
    let id = store
        .notifier()
        .register(&collection, false, Arc::new(PanickingObserver));

    let writer = Arc::clone(&store);
    let uri = collection.clone();
    let outcome = thread::spawn(move || {
        writer.insert(&uri, &entry("Kannur")).unwrap();
    })
    .join();
    assert!(outcome.is_err());

    assert!(store.notifier().unregister(id));
    let subscription = store.notifier().subscribe(&collection, false);
    store.insert(&collection, &entry("Oslo")).unwrap();

    assert_eq!(subscription.drain().len(), 1);
    let cursor = store
        .query(&collection, None, &Selection::all(), None)
        .unwrap();
    assert_eq!(cursor.len(), 2);
}

#[test]
fn subscription_id_unregisters_the_channel() {
    let store = store();
    let collection = store.collection_uri();
    let subscription = store.notifier().subscribe(&collection, false);

    assert!(store.notifier().unregister(subscription.id()));
    store.insert(&collection, &entry("Kannur")).unwrap();

    assert!(subscription.try_next().is_none());
}
