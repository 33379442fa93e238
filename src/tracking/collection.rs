use super::catheter::Catheter;
use crate::config::CatheterConfig;

/// Synchronous observer of collection mutations. Dispatch happens inline
/// with the mutation; there is no async delivery.
pub trait CollectionObserver {
    fn catheter_added(&mut self, index: usize) {
        let _ = index;
    }
    fn catheter_removed(&mut self, index: usize) {
        let _ = index;
    }
    fn collection_cleared(&mut self) {}
}

/// Ordered registry of catheters. IDs increase monotonically and are never
/// reused within a session, even across removals.
#[derive(Default)]
pub struct CatheterCollection {
    catheters: Vec<Catheter>,
    next_id: u32,
    observers: Vec<Box<dyn CollectionObserver>>,
}

impl CatheterCollection {
    pub fn new() -> Self {
        CatheterCollection::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn CollectionObserver>) {
        self.observers.push(observer);
    }

    pub fn add(&mut self, config: &CatheterConfig) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.catheters.push(Catheter::from_config(id, config));
        let index = self.catheters.len() - 1;
        for observer in self.observers.iter_mut() {
            observer.catheter_added(index);
        }
        id
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Catheter> {
        if index >= self.catheters.len() {
            return None;
        }
        let catheter = self.catheters.remove(index);
        for observer in self.observers.iter_mut() {
            observer.catheter_removed(index);
        }
        Some(catheter)
    }

    pub fn remove_by_id(&mut self, id: u32) -> Option<Catheter> {
        let index = self.catheters.iter().position(|c| c.id == id)?;
        self.remove_at(index)
    }

    pub fn clear(&mut self) {
        self.catheters.clear();
        for observer in self.observers.iter_mut() {
            observer.collection_cleared();
        }
    }

    pub fn count(&self) -> usize {
        self.catheters.len()
    }

    pub fn get(&self, index: usize) -> Option<&Catheter> {
        self.catheters.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Catheter> {
        self.catheters.get_mut(index)
    }

    pub fn by_id(&self, id: u32) -> Option<&Catheter> {
        self.catheters.iter().find(|c| c.id == id)
    }

    pub fn by_id_mut(&mut self, id: u32) -> Option<&mut Catheter> {
        self.catheters.iter_mut().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Catheter> {
        self.catheters.iter()
    }
}

#[cfg(test)]
mod collection_tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
    }

    struct Recorder(Rc<RefCell<EventLog>>);

    impl CollectionObserver for Recorder {
        fn catheter_added(&mut self, index: usize) {
            self.0.borrow_mut().events.push(format!("added {}", index));
        }
        fn catheter_removed(&mut self, index: usize) {
            self.0
                .borrow_mut()
                .events
                .push(format!("removed {}", index));
        }
        fn collection_cleared(&mut self) {
            self.0.borrow_mut().events.push("cleared".to_string());
        }
    }

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let mut collection = CatheterCollection::new();
        let a = collection.add(&CatheterConfig::default());
        let b = collection.add(&CatheterConfig::default());
        assert!(b > a);
        collection.remove_by_id(b);
        let c = collection.add(&CatheterConfig::default());
        assert!(c > b, "removed ids must not be reused");
    }

    #[test]
    fn test_observers_fire_synchronously() {
        let log = Rc::new(RefCell::new(EventLog::default()));
        let mut collection = CatheterCollection::new();
        collection.subscribe(Box::new(Recorder(log.clone())));

        collection.add(&CatheterConfig::default());
        collection.add(&CatheterConfig::default());
        collection.remove_at(0);
        collection.clear();

        assert_eq!(
            log.borrow().events,
            vec!["added 0", "added 1", "removed 0", "cleared"]
        );
    }

    #[test]
    fn test_lookup_by_id_after_removal() {
        let mut collection = CatheterCollection::new();
        let a = collection.add(&CatheterConfig::default());
        let b = collection.add(&CatheterConfig::default());
        collection.remove_by_id(a);
        assert!(collection.by_id(a).is_none());
        assert_eq!(collection.by_id(b).unwrap().id, b);
        assert_eq!(collection.count(), 1);
    }

    #[test]
    fn test_remove_out_of_range_is_none() {
        let mut collection = CatheterCollection::new();
        assert!(collection.remove_at(3).is_none());
    }
}
