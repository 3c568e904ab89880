//! Call targets for comparing dispatch mechanisms.
//!
//! Every target returns the same constant so the only variable between
//! workloads built from them is how the call is resolved: through a
//! type-erased box, through a function pointer the optimizer cannot see
//! through, through a stateless callable object, or through a closure.

use std::hint::black_box;

/// The work behind every dispatch mechanism.
#[inline]
pub fn real_implementation() -> i64 {
    1
}

/// A call target invoked through a trait, statically or via `dyn`.
pub trait Callable {
    fn call(&self) -> i64;
}

/// Stateless callable object. Calls through it are resolved at compile
/// time when used generically and can be inlined.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectFunctor;

impl Callable for ObjectFunctor {
    #[inline]
    fn call(&self) -> i64 {
        real_implementation()
    }
}

/// [`real_implementation`] behind a boxed `dyn Fn`, the equivalent of a
/// bound, type-erased function wrapper. Every call is indirect.
pub fn type_erased() -> Box<dyn Fn() -> i64> {
    Box::new(real_implementation)
}

/// [`real_implementation`] as a function pointer laundered through
/// `black_box`, so the call cannot be devirtualized or inlined.
pub fn opaque_fn_pointer() -> fn() -> i64 {
    black_box(real_implementation as fn() -> i64)
}

/// `callable` as a trait object, forcing a vtable call.
pub fn virtual_call(callable: &dyn Callable) -> i64 {
    callable.call()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_n;

    #[test]
    fn should_agree_on_result_across_mechanisms() {
        let n = 1_000;
        let erased = type_erased();
        let pointer = opaque_fn_pointer();
        let functor = ObjectFunctor;
        let virt: &dyn Callable = &functor;

        assert_eq!(call_n(&erased, n), 1_000);
        assert_eq!(call_n(pointer, n), 1_000);
        assert_eq!(call_n(|| functor.call(), n), 1_000);
        assert_eq!(call_n(|| virtual_call(virt), n), 1_000);
        assert_eq!(call_n(|| real_implementation(), n), 1_000);
    }
}
