//! Graph API message payloads.
//!
//! Interactive button messages accept at most three buttons, each titled with
//! at most twenty characters; longer option lists are cut to fit.

use serde::Serialize;

use parley_types::outbound::OutboundPayload;

pub const MAX_BUTTONS: usize = 3;
pub const MAX_BUTTON_TITLE_CHARS: usize = 20;

#[derive(Debug, Serialize, PartialEq)]
pub struct GraphMessage<'a> {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: &'a str,
    #[serde(flatten)]
    pub content: GraphContent<'a>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphContent<'a> {
    Text { text: TextBody<'a> },
    Interactive { interactive: Interactive<'a> },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TextBody<'a> {
    pub preview_url: bool,
    pub body: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Interactive<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub body: InteractiveBody<'a>,
    pub action: ButtonAction,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct InteractiveBody<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ButtonAction {
    pub buttons: Vec<Button>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub reply: ButtonReply,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ButtonReply {
    pub id: String,
    pub title: String,
}

impl<'a> GraphMessage<'a> {
    /// Render an outbound payload for `recipient`.
    ///
    /// An interactive payload without options has nothing to click and is
    /// sent as plain text.
    pub fn render(recipient: &'a str, payload: &'a OutboundPayload) -> Self {
        let content = match payload {
            OutboundPayload::Interactive { body, options } if !options.is_empty() => {
                GraphContent::Interactive {
                    interactive: Interactive {
                        kind: "button",
                        body: InteractiveBody { text: body },
                        action: ButtonAction {
                            buttons: buttons(options),
                        },
                    },
                }
            }
            other => GraphContent::Text {
                text: TextBody {
                    preview_url: false,
                    body: other.body(),
                },
            },
        };
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: recipient,
            content,
        }
    }
}

fn buttons(options: &[String]) -> Vec<Button> {
    options
        .iter()
        .take(MAX_BUTTONS)
        .enumerate()
        .map(|(i, title)| Button {
            kind: "reply",
            reply: ButtonReply {
                id: format!("button_{}", i + 1),
                title: title.chars().take(MAX_BUTTON_TITLE_CHARS).collect(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_text() {
        let payload = OutboundPayload::Text { body: "Hola".into() };
        let value = serde_json::to_value(GraphMessage::render("5491100000000", &payload)).unwrap();
        assert_eq!(
            value,
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "5491100000000",
                "type": "text",
                "text": {"preview_url": false, "body": "Hola"}
            })
        );
    }

    #[test]
    fn test_render_interactive_buttons() {
        let payload = OutboundPayload::Interactive {
            body: "¿Te interesa?".into(),
            options: vec!["Sí".into(), "No".into()],
        };
        let value = serde_json::to_value(GraphMessage::render("549", &payload)).unwrap();
        assert_eq!(value["type"], "interactive");
        assert_eq!(value["interactive"]["type"], "button");
        assert_eq!(value["interactive"]["body"]["text"], "¿Te interesa?");
        assert_eq!(
            value["interactive"]["action"]["buttons"],
            json!([
                {"type": "reply", "reply": {"id": "button_1", "title": "Sí"}},
                {"type": "reply", "reply": {"id": "button_2", "title": "No"}}
            ])
        );
    }

    #[test]
    fn test_buttons_are_capped_and_truncated() {
        let payload = OutboundPayload::Interactive {
            body: "Elegí".into(),
            options: vec![
                "Una opción con un título demasiado largo".into(),
                "b".into(),
                "c".into(),
                "d".into(),
            ],
        };
        let message = GraphMessage::render("549", &payload);
        let GraphContent::Interactive { interactive } = message.content else {
            panic!("expected interactive content");
        };
        let buttons = interactive.action.buttons;
        assert_eq!(buttons.len(), MAX_BUTTONS);
        assert_eq!(buttons[0].reply.title.chars().count(), MAX_BUTTON_TITLE_CHARS);
        assert_eq!(buttons[0].reply.title, "Una opción con un tí");
        assert_eq!(buttons[2].reply.id, "button_3");
    }

    #[test]
    fn test_interactive_without_options_is_text() {
        let payload = OutboundPayload::Interactive {
            body: "¿Algo más?".into(),
            options: Vec::new(),
        };
        let value = serde_json::to_value(GraphMessage::render("549", &payload)).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["text"]["body"], "¿Algo más?");
    }
}
