/// What an element is for, so the terminal knows where to paint it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role
{
    Title,
    Status,
    Stat { label: String },
    Cell(usize),
    Banner,
    Caption,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element
{
    pub id: String,
    pub role: Role,
    pub text: String,
    pub class: String,
}

impl Element
{
    pub fn new(id: impl Into<String>, role: Role) -> Self
    {
        Self {
            id: id.into(),
            role,
            text: String::new(),
            class: String::new(),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self
    {
        self.text = text.into();
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self
    {
        self.class = class.into();
        self
    }

    pub fn has_class(&self, class: &str) -> bool
    {
        self.class.split_whitespace().any(|name| name == class)
    }
}

/// The single render target shared by every game.
///
/// Games replace the whole content when they render and afterwards address
/// elements by id. Updates to an id that is not on the surface are no-ops and
/// report `false`, so a game that is not on screen never disturbs the one
/// that is.
#[derive(Default)]
pub struct Surface
{
    elements: Vec<Element>,
    notice: Option<String>,
}

impl Surface
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn replace(&mut self, elements: Vec<Element>)
    {
        self.elements = elements;
    }

    pub fn elements(&self) -> &[Element]
    {
        &self.elements
    }

    #[cfg(test)]
    pub fn element(&self, id: &str) -> Option<&Element>
    {
        self.elements.iter().find(|element| element.id == id)
    }

    #[cfg(test)]
    pub fn text(&self, id: &str) -> Option<&str>
    {
        self.element(id).map(|element| element.text.as_str())
    }

    pub fn set_text(&mut self, id: &str, text: impl Into<String>) -> bool
    {
        match self.element_mut(id) {
            Some(element) => {
                element.text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn set_class(&mut self, id: &str, class: impl Into<String>) -> bool
    {
        match self.element_mut(id) {
            Some(element) => {
                element.class = class.into();
                true
            }
            None => false,
        }
    }

    pub fn add_class(&mut self, id: &str, class: &str) -> bool
    {
        match self.element_mut(id) {
            Some(element) => {
                if !element.has_class(class) {
                    if !element.class.is_empty() {
                        element.class.push(' ');
                    }
                    element.class.push_str(class);
                }
                true
            }
            None => false,
        }
    }

    /// Queues a one-off message for the shell to show as a toast.
    pub fn notify(&mut self, message: impl Into<String>)
    {
        self.notice = Some(message.into());
    }

    pub fn take_notice(&mut self) -> Option<String>
    {
        self.notice.take()
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut Element>
    {
        self.elements.iter_mut().find(|element| element.id == id)
    }
}
