use std::collections::HashMap;

/// Owned description of a piece of markup.
///
/// Elements are plain values built with chained setters and turned into live
/// nodes by [`Document::new`](crate::Document::new) or
/// [`Document::create_element`](crate::Document::create_element).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    // Identity
    pub tag: String,
    pub id: Option<String>,

    // Markup
    pub attributes: HashMap<String, String>,
    pub classes: Vec<String>,
    pub text: Option<String>,

    // Form control state
    pub value: String,
    pub checked: bool,

    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn form(id: impl Into<String>) -> Self {
        Self::new("form").id(id)
    }

    pub fn div() -> Self {
        Self::new("div")
    }

    /// Create an `<input>` with the given `type` and `name` attributes.
    pub fn input(input_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new("input")
            .attr("type", input_type)
            .name(name)
    }

    pub fn text_input(name: impl Into<String>) -> Self {
        Self::input("text", name)
    }

    pub fn hidden(name: impl Into<String>) -> Self {
        Self::input("hidden", name)
    }

    pub fn checkbox(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::input("checkbox", name).value(value)
    }

    pub fn radio(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::input("radio", name).value(value)
    }

    // Identity
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.attr("name", name)
    }

    // Markup
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Set a `data-*` attribute. `data("val-rules", ..)` sets `data-val-rules`.
    pub fn data(self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        let key = format!("data-{}", key.as_ref());
        self.attr(key, value)
    }

    pub fn get_data(&self, key: &str) -> Option<&String> {
        self.attributes.get(&format!("data-{key}"))
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        for part in class.split_whitespace() {
            if !self.classes.iter().any(|c| c == part) {
                self.classes.push(part.to_string());
            }
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    // Form control state
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    // Children
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, new_children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(new_children);
        self
    }
}
