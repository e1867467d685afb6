use serde::{Deserialize, Serialize};

/// A human contact target shown in the handoff menu. The list order is the
/// order operators configured; it is meaningful and preserved end to end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: u32,
    pub name: String,
    pub phone: String,
    #[serde(default = "default_emoji")]
    pub emoji: String,
}

fn default_emoji() -> String {
    "📞".to_string()
}

impl Department {
    /// External contact URL the widget opens in a new tab.
    pub fn whatsapp_url(&self) -> String {
        let digits: String = self.phone.chars().filter(char::is_ascii_digit).collect();
        format!("https://wa.me/{digits}")
    }
}

pub trait DepartmentDirectory: Send + Sync {
    fn list_ordered(&self) -> Vec<Department>;

    fn find(&self, id: u32) -> Option<Department> {
        self.list_ordered().into_iter().find(|department| department.id == id)
    }
}

/// Directory seeded once from configuration. Department persistence lives
/// outside this service; this is the read side only.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectory {
    departments: Vec<Department>,
}

impl InMemoryDirectory {
    pub fn new(departments: Vec<Department>) -> Self {
        Self { departments }
    }
}

impl DepartmentDirectory for InMemoryDirectory {
    fn list_ordered(&self) -> Vec<Department> {
        self.departments.clone()
    }
}
