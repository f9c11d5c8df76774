//! Form guard: restore, persist and release for one form

use std::rc::Rc;

use crate::error::{Result, VapeError};
use crate::field::{FieldElement, FormElement, protected_fields};
use crate::key::StorageKey;
use crate::platform::Environment;
use crate::settings::Settings;
use crate::storage::{BackendKind, StorageBackend, select_backend};

/// A field under protection together with its storage key
pub struct ProtectedField<F> {
    pub element: F,
    pub key: StorageKey,
}

/// Keeps one form's fields in sync with the selected backend.
///
/// Created by [`protect`]. Listeners registered on the form and its fields
/// hold a strong reference, so the guard lives as long as the form does.
pub struct FormGuard<F> {
    form_id: String,
    fields: Vec<ProtectedField<F>>,
    backend: Rc<dyn StorageBackend>,
}

impl<F: FieldElement> FormGuard<F> {
    pub fn new(form_id: &str, elements: Vec<F>, backend: Rc<dyn StorageBackend>) -> Self {
        let fields = elements
            .into_iter()
            .map(|element| {
                let info = element.info();
                let key = StorageKey::derive(form_id, info.id.as_deref(), info.name.as_deref());
                ProtectedField { element, key }
            })
            .collect();

        Self {
            form_id: form_id.to_string(),
            fields,
            backend,
        }
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn fields(&self) -> &[ProtectedField<F>] {
        &self.fields
    }

    /// Fill every field that has a saved value. Returns how many were filled.
    pub fn restore(&self) -> usize {
        let mut restored = 0;
        for field in &self.fields {
            match self.backend.read(&field.key) {
                Some(value) if !value.is_empty() => {
                    log::debug!("Restoring {}", field.key);
                    field.element.set_value(&value);
                    restored += 1;
                }
                _ => {}
            }
        }
        restored
    }

    /// Save the current value of field `index`. Failures are logged, never raised.
    pub fn persist(&self, index: usize) {
        let Some(field) = self.fields.get(index) else {
            return;
        };
        let value = field.element.value();
        if let Err(err) = self.backend.write(&field.key, Some(value.as_str())) {
            log::warn!("VAPE: {err}");
        }
    }

    /// Forget every saved value of this form
    pub fn release(&self) {
        for field in &self.fields {
            if let Err(err) = self.backend.write(&field.key, None) {
                log::warn!("VAPE: could not release {}: {err}", field.key);
            }
        }
        log::debug!("Released form {:?}", self.form_id);
    }

    fn attach<T>(self: &Rc<Self>, form: &T)
    where
        T: FormElement<Field = F>,
    {
        for (index, field) in self.fields.iter().enumerate() {
            let guard = Rc::clone(self);
            field.element.on_change(Box::new(move || guard.persist(index)));
        }

        let guard = Rc::clone(self);
        form.on_release(Box::new(move || guard.release()));
    }
}

/// Start protecting `form`.
///
/// Selects a backend, restores saved values, then wires persist and release
/// listeners. When no backend can be used a single diagnostic is logged,
/// nothing is attached and [`VapeError::NoBackend`] is returned.
pub fn protect<E, T>(env: &E, form: &T, settings: &Settings) -> Result<Rc<FormGuard<T::Field>>>
where
    E: Environment,
    T: FormElement,
{
    let form_id = form.id().unwrap_or_default();

    let Some(backend) = select_backend(env, settings) else {
        log::error!("VAPE ERROR: neither localStorage nor cookies can be used (form {form_id:?})");
        return Err(VapeError::NoBackend);
    };

    let fields = protected_fields(form, settings);
    let guard = Rc::new(FormGuard::new(&form_id, fields, backend));

    // Restore strictly before listeners exist
    let restored = guard.restore();
    guard.attach(form);

    log::info!(
        "Protecting form {:?}: {} fields via {}, {} restored",
        guard.form_id(),
        guard.fields().len(),
        guard.backend_kind().as_str(),
        restored
    );
    Ok(guard)
}

/// Protect every form in `forms`, returning how many got a backend
pub fn protect_each<E, T, I>(env: &E, forms: I, settings: &Settings) -> u32
where
    E: Environment,
    T: FormElement,
    I: IntoIterator<Item = T>,
{
    let mut protected = 0;
    for form in forms {
        if protect(env, &form, settings).is_ok() {
            protected += 1;
        }
    }
    protected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldInfo;
    use crate::platform::memory::{MemoryArea, MemoryEnvironment, MemoryField, MemoryForm};
    use crate::platform::{CookieJar, KeyValueArea};
    use std::cell::Cell;
    use std::sync::Once;

    thread_local! {
        static ERRORS: Cell<usize> = const { Cell::new(0) };
    }

    /// Counts error records logged on the current thread
    struct ErrorCounter;

    impl log::Log for ErrorCounter {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Error
        }

        fn log(&self, record: &log::Record) {
            if record.level() == log::Level::Error {
                ERRORS.with(|count| count.set(count.get() + 1));
            }
        }

        fn flush(&self) {}
    }

    static ERROR_COUNTER: ErrorCounter = ErrorCounter;

    fn count_errors(f: impl FnOnce()) -> usize {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = log::set_logger(&ERROR_COUNTER);
            log::set_max_level(log::LevelFilter::Error);
        });
        ERRORS.with(|count| count.set(0));
        f();
        ERRORS.with(Cell::get)
    }

    fn signup_form() -> MemoryForm {
        MemoryForm::new(
            Some("f1"),
            vec![
                MemoryField::new(FieldInfo::input("text", Some("name"), Some("name"))),
                MemoryField::with_value(FieldInfo::input("email", Some("email"), Some("email")), "abc"),
                MemoryField::new(FieldInfo::input("password", Some("pw"), Some("pw"))),
                MemoryField::new(FieldInfo::textarea(Some("bio"), Some("bio"))),
            ],
        )
    }

    fn area(env: &MemoryEnvironment) -> &MemoryArea {
        env.area().unwrap()
    }

    #[test]
    fn test_restore_fills_saved_value() {
        let env = MemoryEnvironment::new();
        area(&env).set_item("vape~f1~name~name", "Alice").unwrap();
        let form = signup_form();

        let guard = protect(&env, &form, &Settings::default()).unwrap();

        assert_eq!(form.field(0).unwrap().value(), "Alice");
        assert_eq!(guard.backend_kind(), BackendKind::LocalStorage);
    }

    #[test]
    fn test_restore_keeps_existing_value_when_nothing_saved() {
        let env = MemoryEnvironment::new();
        let form = signup_form();
        protect(&env, &form, &Settings::default()).unwrap();

        assert_eq!(form.field(1).unwrap().value(), "abc");
        // restoring never creates entries
        assert!(area(&env).is_empty());
    }

    #[test]
    fn test_typing_persists_latest_value() {
        let env = MemoryEnvironment::new();
        let form = signup_form();
        protect(&env, &form, &Settings::default()).unwrap();

        let name = form.field(0).unwrap();
        name.type_text("B");
        name.type_text("Bob");

        assert_eq!(area(&env).get_item("vape~f1~name~name").as_deref(), Some("Bob"));
        assert_eq!(area(&env).len(), 1);
    }

    #[test]
    fn test_ignored_fields_get_no_listener() {
        let env = MemoryEnvironment::new();
        let form = signup_form();
        protect(&env, &form, &Settings::default()).unwrap();

        let password = form.field(2).unwrap();
        assert_eq!(password.listener_count(), 0);
        password.type_text("hunter2");
        assert!(area(&env).get_item("vape~f1~pw~pw").is_none());
    }

    #[test]
    fn test_submit_releases_every_key() {
        let env = MemoryEnvironment::new();
        let form = signup_form();
        protect(&env, &form, &Settings::default()).unwrap();

        form.field(0).unwrap().type_text("Bob");
        form.field(3).unwrap().type_text("Hello");
        assert_eq!(area(&env).len(), 2);

        form.submit();
        assert!(area(&env).is_empty());
    }

    #[test]
    fn test_reset_releases_like_submit() {
        let env = MemoryEnvironment::cookies_only();
        let form = signup_form();
        let guard = protect(&env, &form, &Settings::default()).unwrap();
        assert_eq!(guard.backend_kind(), BackendKind::Cookies);

        form.field(0).unwrap().type_text("Bob");
        assert!(env.jar().cookie_string().contains("vape~f1~name~name=Bob"));

        form.reset();
        assert_eq!(env.jar().cookie_string(), "");
    }

    #[test]
    fn test_second_page_load_restores_from_cookies() {
        let env = MemoryEnvironment::cookies_only();
        let first = signup_form();
        protect(&env, &first, &Settings::default()).unwrap();
        first.field(3).unwrap().type_text("multi; line = text");

        let reloaded = signup_form();
        protect(&env, &reloaded, &Settings::default()).unwrap();
        assert_eq!(reloaded.field(3).unwrap().value(), "multi; line = text");
    }

    #[test]
    fn test_no_backend_has_no_side_effects() {
        let env = MemoryEnvironment::without_storage();
        let form = signup_form();

        let Err(err) = protect(&env, &form, &Settings::default()) else {
            panic!("protect should fail without storage");
        };
        assert!(matches!(err, VapeError::NoBackend));
        assert_eq!(form.listener_count(), 0);
        assert_eq!(form.field(0).unwrap().listener_count(), 0);

        form.field(0).unwrap().type_text("Bob");
        form.submit();
        // only the probe cookie was ever attempted
        assert_eq!(env.jar().writes(), 1);
        assert_eq!(env.jar().cookie_string(), "");
    }

    #[test]
    fn test_quota_failure_is_swallowed() {
        let env = MemoryEnvironment::with_area(MemoryArea::with_quota(5));
        let form = signup_form();
        protect(&env, &form, &Settings::default()).unwrap();

        let name = form.field(0).unwrap();
        name.type_text("Bob");
        name.type_text("Bob the builder");

        assert_eq!(area(&env).get_item("vape~f1~name~name").as_deref(), Some("Bob"));
        assert_eq!(name.value(), "Bob the builder");
    }

    #[test]
    fn test_forms_do_not_share_keys() {
        let env = MemoryEnvironment::new();
        let a = MemoryForm::new(Some("a"), vec![MemoryField::new(FieldInfo::input("text", Some("q"), None))]);
        let b = MemoryForm::new(Some("b"), vec![MemoryField::new(FieldInfo::input("text", Some("q"), None))]);
        protect(&env, &a, &Settings::default()).unwrap();
        protect(&env, &b, &Settings::default()).unwrap();

        a.field(0).unwrap().type_text("from a");
        b.field(0).unwrap().type_text("from b");
        a.submit();

        assert_eq!(area(&env).keys(), vec!["vape~b~q~".to_string()]);
    }

    #[test]
    fn test_keys_are_stable_across_guards() {
        let env = MemoryEnvironment::new();
        let form = signup_form();
        let first = protect(&env, &form, &Settings::default()).unwrap();
        let second = protect(&env, &form, &Settings::default()).unwrap();

        fn keys(guard: &FormGuard<MemoryField>) -> Vec<StorageKey> {
            guard.fields().iter().map(|f| f.key.clone()).collect()
        }
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(
            keys(&first).iter().map(StorageKey::as_str).collect::<Vec<_>>(),
            vec!["vape~f1~name~name", "vape~f1~email~email", "vape~f1~bio~bio"]
        );
    }

    #[test]
    fn test_missing_form_id_still_works() {
        let env = MemoryEnvironment::new();
        let form = MemoryForm::new(None, vec![MemoryField::new(FieldInfo::input("text", None, Some("q")))]);
        protect(&env, &form, &Settings::default()).unwrap();
        form.field(0).unwrap().type_text("x");
        assert_eq!(area(&env).keys(), vec!["vape~~~q".to_string()]);
    }

    #[test]
    fn test_no_backend_logs_exactly_one_error() {
        let env = MemoryEnvironment::without_storage();
        let form = signup_form();

        let errors = count_errors(|| {
            assert!(protect(&env, &form, &Settings::default()).is_err());
        });
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_working_backend_logs_no_error() {
        let env = MemoryEnvironment::new();
        let form = signup_form();

        let errors = count_errors(|| {
            protect(&env, &form, &Settings::default()).unwrap();
            form.field(0).unwrap().type_text("Bob");
            form.submit();
        });
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_protect_each_counts_protected_forms() {
        let env = MemoryEnvironment::new();
        let forms = vec![signup_form(), MemoryForm::new(Some("f2"), Vec::new())];
        assert_eq!(protect_each(&env, forms, &Settings::default()), 2);

        let blocked = MemoryEnvironment::without_storage();
        let forms = vec![signup_form(), signup_form()];
        assert_eq!(protect_each(&blocked, forms, &Settings::default()), 0);
    }

    #[test]
    fn test_protect_each_wires_every_form() {
        let env = MemoryEnvironment::new();
        let a = MemoryForm::new(Some("a"), vec![MemoryField::new(FieldInfo::input("text", Some("q"), None))]);
        let b = MemoryForm::new(Some("b"), vec![MemoryField::new(FieldInfo::input("text", Some("q"), None))]);
        let field_a = a.field(0).unwrap().clone();
        let field_b = b.field(0).unwrap().clone();

        assert_eq!(protect_each(&env, [a, b], &Settings::default()), 2);
        field_a.type_text("one");
        field_b.type_text("two");
        assert_eq!(area(&env).keys(), vec!["vape~a~q~".to_string(), "vape~b~q~".to_string()]);
    }
}
