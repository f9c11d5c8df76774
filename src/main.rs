//! Vape entry point
//!
//! The web build is a library loaded by the page (see `platform::web`).
//! Natively this walks an in-memory form through a crash and a submit.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use vape::platform::memory::{MemoryEnvironment, MemoryField, MemoryForm};
    use vape::{FieldElement, FieldInfo, Settings, protect};

    env_logger::init();
    log::info!("Vape (native) starting...");

    let env = MemoryEnvironment::new();
    let settings = Settings::default();
    let contact_form = || {
        MemoryForm::new(
            Some("contact"),
            vec![
                MemoryField::new(FieldInfo::input("text", Some("name"), Some("name"))),
                MemoryField::new(FieldInfo::input("password", Some("pw"), Some("pw"))),
                MemoryField::new(FieldInfo::textarea(Some("message"), Some("message"))),
            ],
        )
    };
    let show = |label: &str, form: &MemoryForm| {
        let values: Vec<String> = (0..3)
            .filter_map(|i| form.field(i))
            .map(|f| format!("{:?}", f.value()))
            .collect();
        println!("{label:<24} {}", values.join(", "));
    };

    let form = contact_form();
    if let Err(err) = protect(&env, &form, &settings) {
        eprintln!("{err}");
        return;
    }
    for (index, text) in [(0, "Ada"), (1, "secret"), (2, "Hello there")] {
        if let Some(field) = form.field(index) {
            field.type_text(text);
        }
    }
    show("typed:", &form);

    // Tab closed: a fresh page with the same form
    let reloaded = contact_form();
    if let Err(err) = protect(&env, &reloaded, &settings) {
        eprintln!("{err}");
        return;
    }
    show("after reload:", &reloaded);

    reloaded.submit();
    let after_submit = contact_form();
    if let Err(err) = protect(&env, &after_submit, &settings) {
        eprintln!("{err}");
        return;
    }
    show("after submit + reload:", &after_submit);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is `platform::web::start`, this is just to satisfy the compiler
}
