/// 观察者句柄，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// 变更通知列表：同步派发，按注册顺序调用
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn FnMut()>)>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut() + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// 返回是否确实移除了一个观察者
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn notify(&mut self) {
        for (_, callback) in self.entries.iter_mut() {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_notify_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::new();

        for tag in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            observers.subscribe(move || log.borrow_mut().push(tag));
        }

        observers.notify();
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unsubscribe() {
        let hits = Rc::new(RefCell::new(0));
        let mut observers = Observers::new();

        let h = Rc::clone(&hits);
        let id = observers.subscribe(move || *h.borrow_mut() += 1);
        assert_eq!(observers.len(), 1);

        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        assert!(observers.is_empty());

        observers.notify();
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut observers = Observers::new();
        let first = observers.subscribe(|| {});
        observers.unsubscribe(first);
        let second = observers.subscribe(|| {});
        assert_ne!(first, second);
    }
}
