use serde::{Deserialize, Serialize};

use crate::dialogue::states::Phase;
use crate::domain::department::Department;

/// The typed envelope returned to the widget. Exactly one variant per turn;
/// field names match what the embeddable client reads (`reply`, `replies`,
/// `options.items`, `jumpTo`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueResponse {
    Reply {
        reply: String,
        phase: Phase,
    },
    Replies {
        replies: Vec<String>,
    },
    Menu {
        reply: String,
        options: MenuOptions,
    },
    Redirect {
        reply: String,
        #[serde(rename = "jumpTo")]
        jump_to: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOptions {
    pub items: Vec<MenuItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subitems: Option<Vec<MenuSubitem>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSubitem {
    pub id: u32,
    pub name: String,
    pub emoji: String,
}

impl DialogueResponse {
    pub fn reply(text: impl Into<String>, phase: Phase) -> Self {
        Self::Reply { reply: text.into(), phase }
    }

    pub fn replies(texts: Vec<String>) -> Self {
        Self::Replies { replies: texts }
    }

    pub fn redirect(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Redirect { reply: text.into(), jump_to: url.into() }
    }

    /// The two-branch handoff menu: one AI option plus the ordered
    /// department list as subitems of the human option.
    pub fn menu(text: impl Into<String>, departments: &[Department]) -> Self {
        let subitems = departments
            .iter()
            .map(|department| MenuSubitem {
                id: department.id,
                name: department.name.clone(),
                emoji: department.emoji.clone(),
            })
            .collect::<Vec<_>>();

        Self::Menu {
            reply: text.into(),
            options: MenuOptions {
                items: vec![
                    MenuItem {
                        id: "ai".to_string(),
                        label: "🤖 Conversar com a assistente virtual".to_string(),
                        subitems: None,
                    },
                    MenuItem {
                        id: "human".to_string(),
                        label: "👥 Falar com um atendente".to_string(),
                        subitems: Some(subitems),
                    },
                ],
            },
        }
    }
}
