//! Weak conventions: declared operations a value may decline to provide.

use veneer::prelude::*;

facade! {
    /// Optional export surface. Values opt in to the convention but may
    /// leave any method to the error-returning default.
    facade Exportable {
        weak convention Export {
            fn to_json(&self) -> String;
            fn tag(&self) -> u32;
            fn adjust(&mut self, delta: i64) -> i64;
            fn touch(&self);
        }
    }
}

/// Provides everything except `tag`.
struct Record {
    level: i64,
}

impl Export for Record {
    fn to_json(&self) -> Result<String, NotImplemented> {
        Ok(format!("{{\"level\":{}}}", self.level))
    }

    fn adjust(&mut self, delta: i64) -> Result<i64, NotImplemented> {
        self.level += delta;
        Ok(self.level)
    }

    fn touch(&self) -> Result<(), NotImplemented> {
        Ok(())
    }
}

/// Opts in to the convention without providing a single method.
struct Husk;

impl Export for Husk {}

// ---------------------------------------------------------------------------

#[test]
fn provided_methods_dispatch_normally() {
    veneer_testhelpers::setup();

    let mut p: Proxy<Exportable> = make_proxy(Record { level: 3 });
    assert_eq!(p.to_json().unwrap(), "{\"level\":3}");
    assert_eq!(p.adjust(4).unwrap(), 7);
    assert_eq!(p.to_json().unwrap(), "{\"level\":7}");
    assert_eq!(p.touch(), Ok(()));
}

#[test]
fn missing_methods_surface_as_errors() {
    veneer_testhelpers::setup();

    let p: Proxy<Exportable> = make_proxy(Record { level: 3 });
    let err = p.tag().unwrap_err();
    assert_eq!(err.operation(), "Export::tag");
    assert!(err.to_string().contains("Export::tag"));
}

#[test]
fn failure_leaves_the_wrapper_engaged() {
    veneer_testhelpers::setup();

    let mut p: Proxy<Exportable> = make_proxy(Husk);
    assert!(p.to_json().is_err());
    assert!(p.tag().is_err());
    assert!(p.adjust(1).is_err());
    assert!(p.touch().is_err());
    assert!(p.has_value());
    // Still dispatchable after every miss.
    assert_eq!(p.tag().unwrap_err().operation(), "Export::tag");
}
