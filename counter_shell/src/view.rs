//! The current-view cell and its UI subscribers.
//!
//! Exactly one `ViewModel` is current at a time. It is replaced wholesale
//! by the Render handler and nothing else writes it. Observers are notified
//! synchronously, in subscription order, after each replacement.

use std::fmt;

use counter_core::ViewModel;

/// UI-binding collaborator interested in new view snapshots.
pub trait ViewObserver {
    fn view_changed(&self, view: &ViewModel);
}

impl<F> ViewObserver for F
where
    F: Fn(&ViewModel),
{
    fn view_changed(&self, view: &ViewModel) {
        self(view)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub struct ViewCell {
    current: ViewModel,
    observers: Vec<(SubscriptionId, Box<dyn ViewObserver>)>,
    next_id: u64,
    publishes: u64,
}

impl ViewCell {
    pub fn new(initial: ViewModel) -> Self {
        Self {
            current: initial,
            observers: Vec::new(),
            next_id: 0,
            publishes: 0,
        }
    }

    pub fn current(&self) -> &ViewModel {
        &self.current
    }

    /// Number of publishes since construction (the initial pull excluded).
    pub fn publishes(&self) -> u64 {
        self.publishes
    }

    pub fn subscribe(&mut self, observer: impl ViewObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Replace the current view, then notify every observer.
    pub(crate) fn publish(&mut self, view: ViewModel) {
        self.current = view;
        self.publishes += 1;
        for (_, observer) in &self.observers {
            observer.view_changed(&self.current);
        }
    }
}

impl fmt::Debug for ViewCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCell")
            .field("current", &self.current)
            .field("observers", &self.observers.len())
            .field("publishes", &self.publishes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn view(count: &str) -> ViewModel {
        ViewModel {
            count: count.to_string(),
            message: String::new(),
        }
    }

    #[test]
    fn publish_replaces_and_notifies() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut cell = ViewCell::new(view("0"));
        let sink = Rc::clone(&seen);
        cell.subscribe(move |v: &ViewModel| sink.borrow_mut().push(v.clone()));

        cell.publish(view("1"));

        assert_eq!(cell.current(), &view("1"));
        assert_eq!(*seen.borrow(), vec![view("1")]);
        assert_eq!(cell.publishes(), 1);
    }

    #[test]
    fn observers_run_in_subscription_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut cell = ViewCell::new(view("0"));
        for name in ["first", "second"] {
            let order = Rc::clone(&order);
            cell.subscribe(move |_: &ViewModel| order.borrow_mut().push(name));
        }

        cell.publish(view("1"));

        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribed_observer_is_not_notified() {
        let hits = Rc::new(RefCell::new(0));
        let mut cell = ViewCell::new(view("0"));
        let counter = Rc::clone(&hits);
        let id = cell.subscribe(move |_: &ViewModel| *counter.borrow_mut() += 1);

        assert!(cell.unsubscribe(id));
        assert!(!cell.unsubscribe(id));
        cell.publish(view("1"));

        assert_eq!(*hits.borrow(), 0);
    }
}
