//! The prelude is enough to build a working form.

use std::cell::RefCell;
use std::rc::Rc;

use tether::prelude::*;

#[derive(Default)]
struct Signup {
    email: String,
    age: i32,
}

impl Bean for Signup {
    fn properties(table: &mut PropertyTable<Self>) {
        table
            .property("email", |s| s.email.clone(), |s, v| s.email = v)
            .property("age", |s| s.age, |s, v| s.age = v);
    }
}

fn form() -> (Binder<Signup>, Rc<ValueField<String>>, Rc<ValueField<String>>) {
    let binder = Binder::<Signup>::new();
    let email = Rc::new(ValueField::text());
    let age = Rc::new(ValueField::text());
    binder
        .for_field(&email)
        .with_validator(EmailValidator::new("Not an email address"))
        .bind_property("email")
        .unwrap();
    binder
        .for_field(&age)
        .with_converter(StringToIntConverter::new("Age must be a number"))
        .with_validator(RangeValidator::between("Age must be between 18 and 130", 18, 130))
        .bind_property("age")
        .unwrap();
    (binder, email, age)
}

#[test]
fn draft_form_writes_once_valid() {
    let (binder, email, age) = form();
    email.set_value("ada@example.org".to_string()).unwrap();
    age.set_value("12".to_string()).unwrap();

    let mut signup = Signup::default();
    assert!(binder.write_bean(&mut signup).is_err());
    assert_eq!(signup.age, 0);

    age.set_value("36".to_string()).unwrap();
    binder.write_bean(&mut signup).unwrap();
    assert_eq!(signup.email, "ada@example.org");
    assert_eq!(signup.age, 36);
}

#[test]
fn live_bean_reports_field_errors() {
    let (binder, email, _age) = form();
    let bean = Rc::new(RefCell::new(Signup::default()));
    binder.set_bean(Some(Rc::clone(&bean))).unwrap();

    email.input("not-an-address").unwrap();
    assert_eq!(email.error_message().as_deref(), Some("Not an email address"));
    assert!(bean.borrow().email.is_empty());
}

#[cfg(feature = "transfer")]
#[test]
fn transfer_is_reachable_from_the_facade() {
    use std::sync::atomic::AtomicBool;

    let mut out = Vec::new();
    let outcome = tether::transfer::transfer(
        &mut &b"abc"[..],
        &mut out,
        &TransferContext::download(),
        &TransferProgressHandlers::new().listeners(),
        &AtomicBool::new(false),
    )
    .unwrap();
    assert_eq!(outcome, TransferOutcome::Completed { bytes: 3 });
}
