// Result channel - the single error-propagation mechanism
//
// Every fallible operation in the library returns an Outcome. Failures carry
// no payload; the human-readable message lives in a per-thread slot that any
// Outcome can be asked for, so error text travels up call chains without
// being plumbed through every return type.

use std::cell::RefCell;

thread_local! {
    // Last failure message recorded on this thread. Deliberately not shared
    // across threads: concurrent callers each get their own slot.
    static FAILURE_TEXT: RefCell<String> = const { RefCell::new(String::new()) };
}

fn set_failure_text(text: &str) {
    FAILURE_TEXT.with(|slot| {
        let mut slot = slot.borrow_mut();
        slot.clear();
        slot.push_str(text);
    });
}

/// Discriminant of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    Failure,
}

/// Tagged success/failure container.
///
/// A successful `Outcome` owns a value of type `T`; a failed one owns
/// nothing. [`Outcome::fail`] additionally records its message in the
/// calling thread's failure slot, which [`Outcome::failure_text`] reads back
/// regardless of which instance produced it. Constructing a failure from a
/// bare [`ResultCode::Failure`] does *not* touch the slot - the previous
/// message, if any, stays.
#[derive(Debug)]
#[must_use]
pub struct Outcome<T> {
    code: ResultCode,
    value: Option<T>,
}

impl<T> Outcome<T> {
    /// Wrap a value as a success.
    pub fn success(value: T) -> Self {
        Self {
            code: ResultCode::Success,
            value: Some(value),
        }
    }

    /// Build an outcome from a bare code. Success default-constructs the
    /// value; Failure carries nothing and leaves the thread's failure text
    /// untouched.
    pub fn from_code(code: ResultCode) -> Self
    where
        T: Default,
    {
        match code {
            ResultCode::Success => Self::success(T::default()),
            ResultCode::Failure => Self {
                code: ResultCode::Failure,
                value: None,
            },
        }
    }

    /// Fail, recording `text` as the calling thread's last failure message.
    pub fn fail(text: impl Into<String>) -> Self {
        let text = text.into();
        set_failure_text(&text);
        Self {
            code: ResultCode::Failure,
            value: None,
        }
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Success
    }

    pub fn is_failure(&self) -> bool {
        self.code == ResultCode::Failure
    }

    /// Borrow the stored value.
    ///
    /// Panics if the outcome is a failure; callers must check the code
    /// first.
    pub fn value(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => panic!("value() called on a failed outcome"),
        }
    }

    /// Mutably borrow the stored value. Panics if the outcome is a failure.
    pub fn value_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => panic!("value_mut() called on a failed outcome"),
        }
    }

    /// Consume the outcome and return the stored value. Panics if the
    /// outcome is a failure.
    pub fn into_value(self) -> T {
        match self.value {
            Some(value) => value,
            None => panic!("into_value() called on a failed outcome"),
        }
    }

    /// Move the contents into a fresh outcome, leaving `self` in the
    /// Failure state. The moved-from instance stays safe to query but no
    /// longer owns a value.
    pub fn take(&mut self) -> Outcome<T> {
        let code = self.code;
        let value = self.value.take();
        self.code = ResultCode::Failure;
        Outcome { code, value }
    }

    /// Last failure message recorded on the calling thread, independent of
    /// which instance is queried. A later failure on the same thread
    /// overwrites it.
    pub fn failure_text(&self) -> String {
        FAILURE_TEXT.with(|slot| slot.borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Drop-tracking helper so tests can account for value teardown.
    static LIVE_TRACKED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Default)]
    struct Tracked {
        value: i32,
    }

    impl Tracked {
        fn new(value: i32) -> Self {
            LIVE_TRACKED.fetch_add(1, Ordering::SeqCst);
            Self { value }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            LIVE_TRACKED.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn construction_with_value() {
        let result = Outcome::success(42);
        assert_eq!(result.code(), ResultCode::Success);
        assert_eq!(*result.value(), 42);
    }

    #[test]
    fn construction_with_success_code_defaults_value() {
        let result: Outcome<i32> = Outcome::from_code(ResultCode::Success);
        assert_eq!(result.code(), ResultCode::Success);
        assert_eq!(*result.value(), 0);
    }

    #[test]
    fn construction_with_failure_code_carries_nothing() {
        let result: Outcome<Tracked> = Outcome::from_code(ResultCode::Failure);
        assert_eq!(result.code(), ResultCode::Failure);
    }

    #[test]
    fn failure_code_construction_does_not_touch_text_slot() {
        let seeded: Outcome<i32> = Outcome::fail("seeded message");
        let bare: Outcome<i32> = Outcome::from_code(ResultCode::Failure);
        // The bare failure must leave the previous message in place.
        assert_eq!(bare.failure_text(), "seeded message");
        assert_eq!(seeded.failure_text(), "seeded message");
    }

    #[test]
    fn failure_text_reflects_most_recent_failure_on_thread() {
        let first: Outcome<i32> = Outcome::fail("first");
        let _second: Outcome<i32> = Outcome::fail("second");
        // Queried through the older instance, the text is still the newest.
        assert_eq!(first.failure_text(), "second");
    }

    #[test]
    fn failure_text_is_thread_local() {
        let local: Outcome<i32> = Outcome::fail("main thread message");
        std::thread::spawn(|| {
            let remote: Outcome<i32> = Outcome::fail("worker thread message");
            assert_eq!(remote.failure_text(), "worker thread message");
        })
        .join()
        .unwrap();
        assert_eq!(local.failure_text(), "main thread message");
    }

    #[test]
    fn take_moves_value_and_invalidates_source() {
        let mut original = Outcome::success(42);
        let moved = original.take();

        assert_eq!(moved.code(), ResultCode::Success);
        assert_eq!(*moved.value(), 42);
        assert_eq!(original.code(), ResultCode::Failure);
    }

    #[test]
    fn take_from_failure_stays_failure() {
        let mut original: Outcome<i32> = Outcome::fail("broken");
        let moved = original.take();
        assert_eq!(moved.code(), ResultCode::Failure);
        assert_eq!(original.code(), ResultCode::Failure);
    }

    #[test]
    fn value_is_dropped_exactly_once() {
        LIVE_TRACKED.store(0, Ordering::SeqCst);
        {
            let mut original = Outcome::success(Tracked::new(7));
            assert_eq!(LIVE_TRACKED.load(Ordering::SeqCst), 1);
            let moved = original.take();
            // Moving transfers ownership without duplicating the value.
            assert_eq!(LIVE_TRACKED.load(Ordering::SeqCst), 1);
            assert_eq!(moved.value().value, 7);
        }
        assert_eq!(LIVE_TRACKED.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn into_value_consumes() {
        let result = Outcome::success(String::from("payload"));
        assert_eq!(result.into_value(), "payload");
    }

    #[test]
    #[should_panic(expected = "value() called on a failed outcome")]
    fn value_on_failure_panics() {
        let result: Outcome<i32> = Outcome::fail("nope");
        let _ = result.value();
    }
}
