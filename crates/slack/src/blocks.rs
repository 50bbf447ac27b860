use orderdesk_core::presenter::LABEL_ELLIPSIS;
use orderdesk_core::{CandidateList, DisplayModel, OrderLink, WorkflowReport};
use serde::Serialize;
use uuid::Uuid;

pub const OPEN_LOOKUP_ACTION: &str = "orderdesk.panel.open_lookup.v1";
pub const CANDIDATE_SELECT_ACTION: &str = "orderdesk.candidates.select.v1";
pub const ORDER_LINK_ACTION: &str = "orderdesk.order.link.v1";
pub const ORDER_LINK_UNAVAILABLE_ACTION: &str = "orderdesk.order.link_unavailable.v1";

pub const LOOKUP_MODAL_CALLBACK: &str = "orderdesk.lookup.modal.v1";
pub const LOOKUP_EMAIL_BLOCK: &str = "orderdesk.lookup.email.v1";
pub const LOOKUP_EXTERNAL_ID_BLOCK: &str = "orderdesk.lookup.external_id.v1";
pub const LOOKUP_EMAIL_INPUT: &str = "email";
pub const LOOKUP_EXTERNAL_ID_INPUT: &str = "external_id";

const CANDIDATE_BLOCK_PREFIX: &str = "orderdesk.candidates.";
const LINK_UNAVAILABLE_LABEL: &str = "Link indisponível";
/// Slack rejects the whole message when any option text runs longer.
const OPTION_TEXT_MAX_CHARS: usize = 75;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
            url: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<TextObject>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StaticSelectElement {
    pub action_id: String,
    pub placeholder: TextObject,
    pub options: Vec<SelectOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    Button(ButtonElement),
    StaticSelect(StaticSelectElement),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlainTextInput {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
}

impl PlainTextInput {
    pub fn new(action_id: impl Into<String>) -> Self {
        Self { kind: "plain_text_input", action_id: action_id.into(), placeholder: None }
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(TextObject::plain(text));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { block_id: String, text: TextObject },
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ActionElement> },
    Context { block_id: String, elements: Vec<TextObject> },
    Input { block_id: String, label: TextObject, element: PlainTextInput, optional: bool },
}

impl Block {
    pub fn block_id(&self) -> &str {
        match self {
            Self::Header { block_id, .. }
            | Self::Section { block_id, .. }
            | Self::Actions { block_id, .. }
            | Self::Context { block_id, .. }
            | Self::Input { block_id, .. } => block_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
    /// Hex color of the attachment bar, for order details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Visible only to the user who triggered it.
    pub ephemeral: bool,
}

impl MessageTemplate {
    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.block_id() == block_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalTemplate {
    pub callback_id: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub close: TextObject,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
    color: Option<String>,
    ephemeral: bool,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self {
            fallback_text: fallback_text.into(),
            blocks: Vec::new(),
            color: None,
            ephemeral: false,
        }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks
            .push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn color(mut self, hex: impl Into<String>) -> Self {
        self.color = Some(hex.into());
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            fallback_text: self.fallback_text,
            blocks: self.blocks,
            color: self.color,
            ephemeral: self.ephemeral,
        }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ActionElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(ActionElement::Button(button));
        self
    }

    pub fn static_select(&mut self, select: StaticSelectElement) -> &mut Self {
        self.elements.push(ActionElement::StaticSelect(select));
        self
    }

    fn build(self) -> Vec<ActionElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Block id of a candidate select. It carries the run id so the selection can
/// be correlated with the run that produced the list.
pub fn candidate_block_id(run_id: Uuid) -> String {
    format!("{CANDIDATE_BLOCK_PREFIX}{run_id}")
}

pub fn run_id_from_block_id(block_id: &str) -> Option<Uuid> {
    block_id.strip_prefix(CANDIDATE_BLOCK_PREFIX).and_then(|raw| Uuid::parse_str(raw).ok())
}

pub fn report_message(report: &WorkflowReport) -> MessageTemplate {
    match report {
        WorkflowReport::Order { display, link } => order_message(display, link),
        WorkflowReport::Candidates(list) => candidate_message(list),
        WorkflowReport::NoResults { message, .. } => notice_message(message),
        WorkflowReport::InvalidInput { message }
        | WorkflowReport::Failed { message, .. }
        | WorkflowReport::DisplayFailed { message } => warning_message(message),
    }
}

pub fn order_message(display: &DisplayModel, link: &OrderLink) -> MessageTemplate {
    let link_button = match link {
        OrderLink::Available { url, order_id } => {
            ButtonElement::new(ORDER_LINK_ACTION, "Link do Pedido")
                .style(ButtonStyle::Primary)
                .value(order_id.clone())
                .url(url.clone())
        }
        OrderLink::Unavailable => {
            ButtonElement::new(ORDER_LINK_UNAVAILABLE_ACTION, LINK_UNAVAILABLE_LABEL)
        }
    };

    MessageBuilder::new(display.title.clone())
        .header("orderdesk.order.header.v1", display.title.clone())
        .section("orderdesk.order.details.v1", |section| {
            section.mrkdwn(display.description.clone());
        })
        .context("orderdesk.order.footer.v1", |context| {
            context.plain(display.footer.clone());
        })
        .actions("orderdesk.order.actions.v1", |actions| {
            actions.button(link_button);
        })
        .color(display.color.hex())
        .ephemeral()
        .build()
}

pub fn candidate_message(list: &CandidateList) -> MessageTemplate {
    let options = list
        .candidates
        .iter()
        .map(|candidate| SelectOption {
            text: TextObject::plain(candidate.label.clone()),
            value: candidate.option_value(),
            description: Some(TextObject::plain(option_text(&candidate.description))),
        })
        .collect();

    MessageBuilder::new(list.summary.description.clone())
        .header("orderdesk.candidates.header.v1", list.summary.title.clone())
        .section("orderdesk.candidates.summary.v1", |section| {
            section.mrkdwn(list.summary.description.clone());
        })
        .actions(candidate_block_id(list.run_id), |actions| {
            actions.static_select(StaticSelectElement {
                action_id: CANDIDATE_SELECT_ACTION.to_owned(),
                placeholder: TextObject::plain(orderdesk_core::selection::SELECT_PLACEHOLDER),
                options,
            });
        })
        .color(list.summary.color.hex())
        .ephemeral()
        .build()
}

fn option_text(text: &str) -> String {
    if text.chars().count() <= OPTION_TEXT_MAX_CHARS {
        return text.to_owned();
    }
    let kept = OPTION_TEXT_MAX_CHARS - LABEL_ELLIPSIS.chars().count();
    let truncated: String = text.chars().take(kept).collect();
    format!("{truncated}{LABEL_ELLIPSIS}")
}

pub fn link_reply_message(text: &str) -> MessageTemplate {
    MessageBuilder::new(text.to_owned())
        .section("orderdesk.order.link_reply.v1", |section| {
            section.mrkdwn(text.to_owned());
        })
        .ephemeral()
        .build()
}

pub fn panel_message() -> MessageTemplate {
    MessageBuilder::new("Painel de verificação de compras")
        .header("orderdesk.panel.header.v1", "Verificação de Compras")
        .section("orderdesk.panel.summary.v1", |section| {
            section.mrkdwn(
                "Clique no botão abaixo para verificar as compras de um cliente por e-mail ou ID de usuário.",
            );
        })
        .actions("orderdesk.panel.actions.v1", |actions| {
            actions.button(
                ButtonElement::new(OPEN_LOOKUP_ACTION, "Verificar Compra")
                    .style(ButtonStyle::Primary),
            );
        })
        .build()
}

pub fn lookup_modal() -> ModalTemplate {
    ModalTemplate {
        callback_id: LOOKUP_MODAL_CALLBACK.to_owned(),
        title: TextObject::plain("Verificar Compra"),
        submit: TextObject::plain("Buscar"),
        close: TextObject::plain("Cancelar"),
        blocks: vec![
            Block::Input {
                block_id: LOOKUP_EMAIL_BLOCK.to_owned(),
                label: TextObject::plain("E-mail do cliente"),
                element: PlainTextInput::new(LOOKUP_EMAIL_INPUT).placeholder("cliente@exemplo.com"),
                optional: true,
            },
            Block::Input {
                block_id: LOOKUP_EXTERNAL_ID_BLOCK.to_owned(),
                label: TextObject::plain("ID de usuário"),
                element: PlainTextInput::new(LOOKUP_EXTERNAL_ID_INPUT).placeholder("123456789"),
                optional: true,
            },
        ],
    }
}

pub fn notice_message(message: &str) -> MessageTemplate {
    MessageBuilder::new(message.to_owned())
        .section("orderdesk.notice.v1", |section| {
            section.mrkdwn(message.to_owned());
        })
        .ephemeral()
        .build()
}

pub fn warning_message(message: &str) -> MessageTemplate {
    MessageBuilder::new(message.to_owned())
        .section("orderdesk.warning.v1", |section| {
            section.mrkdwn(format!(":warning: {message}"));
        })
        .ephemeral()
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("orderdesk.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("orderdesk.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .ephemeral()
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Ajuda do comando /pedido")
        .section("orderdesk.help.summary.v1", |section| {
            section.mrkdwn(
                "*Comandos disponíveis*\n• `/pedido email <e-mail>`\n• `/pedido usuario <id>`\n• `/pedido verificar <id do pedido>`\n• `/pedido buscar`\n• `/pedido painel`\n• `/pedido ajuda`",
            );
        })
        .ephemeral()
        .build()
}
