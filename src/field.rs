//! Form and field abstraction
//!
//! The guard never touches the DOM directly. Hosts describe their elements
//! through [`FormElement`] and [`FieldElement`]; `platform::web` does it for
//! real forms and `platform::memory` for tests and the native demo.

use crate::settings::Settings;

/// Every `type` an HTML `<input>` can have
pub const INPUT_TYPES: [&str; 22] = [
    "button", "checkbox", "color", "date", "datetime-local", "email", "file", "hidden", "image", "month",
    "number", "password", "radio", "range", "reset", "search", "submit", "tel", "text", "time", "url", "week",
];

/// Input types whose `value` is not text the user typed
const NON_TEXT_INPUT_TYPES: [&str; 3] = ["checkbox", "radio", "image"];

/// Element kind of a candidate field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldTag {
    Input,
    TextArea,
}

impl FieldTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldTag::Input => "input",
            FieldTag::TextArea => "textarea",
        }
    }
}

/// Static description of a field, used for filtering and key derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub tag: FieldTag,
    /// Lowercased `type` attribute (`"text"` when absent, `"textarea"` for text areas)
    pub input_type: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub classes: Vec<String>,
}

impl FieldInfo {
    pub fn input(input_type: &str, id: Option<&str>, name: Option<&str>) -> Self {
        let input_type = match input_type.trim() {
            "" => "text".to_string(),
            ty => ty.to_ascii_lowercase(),
        };
        Self {
            tag: FieldTag::Input,
            input_type,
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            classes: Vec::new(),
        }
    }

    pub fn textarea(id: Option<&str>, name: Option<&str>) -> Self {
        Self {
            tag: FieldTag::TextArea,
            input_type: "textarea".to_string(),
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            classes: Vec::new(),
        }
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the field holds free text at all
    pub fn is_text_capable(&self) -> bool {
        match self.tag {
            FieldTag::TextArea => true,
            FieldTag::Input => !NON_TEXT_INPUT_TYPES.contains(&self.input_type.as_str()),
        }
    }
}

/// A single input or text area owned by the host
pub trait FieldElement: Clone + 'static {
    fn info(&self) -> FieldInfo;

    fn value(&self) -> String;

    fn set_value(&self, value: &str);

    /// Register a handler for every user-driven content change
    fn on_change(&self, handler: Box<dyn FnMut()>);
}

/// A form owned by the host
pub trait FormElement {
    type Field: FieldElement;

    /// Caller-assigned unique id of the form
    fn id(&self) -> Option<String>;

    /// Every `input` and `textarea` inside the form, in document order
    fn candidate_fields(&self) -> Vec<Self::Field>;

    /// Register one handler that runs on both submit and reset
    fn on_release(&self, handler: Box<dyn FnMut()>);
}

/// Fields of `form` that should be saved and restored
pub fn protected_fields<F: FormElement>(form: &F, settings: &Settings) -> Vec<F::Field> {
    form.candidate_fields()
        .into_iter()
        .filter(|field| {
            let info = field.info();
            info.is_text_capable() && !settings.is_ignored(&info)
        })
        .collect()
}
