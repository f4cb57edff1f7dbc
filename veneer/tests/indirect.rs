//! Indirect conventions: dispatch reaches the value through `Deref`.

use std::sync::Arc;

use veneer::prelude::*;

facade! {
    /// A counter reached through an owning smart pointer.
    facade Counting {
        indirect convention Count {
            fn current(&self) -> u64;
            fn bump(&mut self);
        }
    }
}

struct Clicks(u64);

impl Count for Clicks {
    fn current(&self) -> u64 {
        self.0
    }

    fn bump(&mut self) {
        self.0 += 1;
    }
}

facade! {
    /// Read-only view; no `&mut` methods, so `Deref` alone qualifies.
    facade Viewing {
        indirect convention View {
            fn view(&self) -> String;
        }
    }
}

struct Photo(&'static str);

impl View for Photo {
    fn view(&self) -> String {
        self.0.to_string()
    }
}

// ---------------------------------------------------------------------------

#[test]
fn boxed_values_dispatch_through_deref() {
    veneer_testhelpers::setup();

    let mut p: Proxy<Counting> = make_proxy_inplace(Box::new(Clicks(0)));
    p.bump();
    p.bump();
    p.bump();
    assert_eq!(p.current(), 3);
}

#[test]
fn shared_handles_observe_one_value() {
    veneer_testhelpers::setup();

    let photo = Arc::new(Photo("sunset"));
    let a: Proxy<Viewing> = make_proxy_inplace(Arc::clone(&photo));
    let b: Proxy<Viewing> = make_proxy_inplace(Arc::clone(&photo));
    assert_eq!(Arc::strong_count(&photo), 3);
    assert_eq!(a.view(), "sunset");
    assert_eq!(a.view(), b.view());

    drop(a);
    assert_eq!(Arc::strong_count(&photo), 2);
    drop(b);
    assert_eq!(Arc::strong_count(&photo), 1);
}

#[test]
fn rebinding_releases_the_previous_handle() {
    veneer_testhelpers::setup();

    let first = Arc::new(Photo("one"));
    let second = Arc::new(Photo("two"));
    let mut p: Proxy<Viewing> = make_proxy_inplace(Arc::clone(&first));
    assert_eq!(p.view(), "one");

    p.emplace(Arc::clone(&second));
    assert_eq!(p.view(), "two");
    assert_eq!(Arc::strong_count(&first), 1);
    assert_eq!(Arc::strong_count(&second), 2);
}
