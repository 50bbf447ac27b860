use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, ConfigError};
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::errors::PresentError;
use crate::normalize::PACKAGE_TYPE_FALLBACK;

pub const LABEL_ID_CHARS: usize = 8;
pub const LABEL_ELLIPSIS: &str = "...";
pub const NO_PACKAGES: &str = "Nenhum pacote encontrado";
pub const DATE_UNAVAILABLE: &str = "Data não disponível";
pub const DEFAULT_LINK_BASE_URL: &str = "https://centralcart.com.br/";

const FOOTER_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Green,
    Amber,
    Red,
    Neutral,
}

impl Color {
    pub fn for_status(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Approved => Self::Green,
            OrderStatus::Pending => Self::Amber,
            OrderStatus::Rejected
            | OrderStatus::Canceled
            | OrderStatus::Expired
            | OrderStatus::Refunded
            | OrderStatus::Chargedback => Self::Red,
            OrderStatus::Unknown => Self::Neutral,
        }
    }

    pub fn rgb(&self) -> u32 {
        match self {
            Self::Green => 0x00FF00,
            Self::Amber => 0xFFAA00,
            Self::Red => 0xFF0000,
            Self::Neutral => 0x2E2E2E,
        }
    }

    pub fn hex(&self) -> String {
        format!("#{:06X}", self.rgb())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayModel {
    pub title: String,
    pub description: String,
    pub color: Color,
    pub footer: String,
}

/// Rendering limits of the chat surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayLimits {
    pub title_chars: usize,
    pub description_chars: usize,
    pub candidates: usize,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self { title_chars: 150, description_chars: 3000, candidates: 100 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderLink {
    Available { url: String, order_id: String },
    Unavailable,
}

pub fn order_link(base_url: &str, id: &OrderId) -> OrderLink {
    match id.as_key() {
        Some(key) => {
            OrderLink::Available { url: format!("{base_url}{key}"), order_id: key.to_owned() }
        }
        None => OrderLink::Unavailable,
    }
}

/// Reply sent when the user asks for the order link.
pub fn link_reply_text(base_url: &str, link: &OrderLink) -> Option<String> {
    match link {
        OrderLink::Available { url, order_id } => Some(format!(
            "Acesse o pedido através do link: {url}\n\nVocê também pode acessar copiando o ID `{order_id}` e adicionando após `{base_url}`"
        )),
        OrderLink::Unavailable => None,
    }
}

/// Short list label: the first eight characters of the id, or of
/// `pedido_<index>` when the id is unavailable, followed by an ellipsis.
pub fn label_for(order: &Order, index: usize) -> String {
    let source = match order.id.as_key() {
        Some(key) => key.to_owned(),
        None => format!("pedido_{index}"),
    };
    let truncated: String = source.chars().take(LABEL_ID_CHARS).collect();
    format!("{truncated}{LABEL_ELLIPSIS}")
}

#[derive(Clone, Debug)]
pub struct OrderPresenter {
    timezone: Tz,
    limits: DisplayLimits,
    link_base_url: String,
}

impl Default for OrderPresenter {
    fn default() -> Self {
        Self::new(chrono_tz::America::Sao_Paulo, DEFAULT_LINK_BASE_URL)
    }
}

impl OrderPresenter {
    pub fn new(timezone: Tz, link_base_url: impl Into<String>) -> Self {
        Self { timezone, limits: DisplayLimits::default(), link_base_url: link_base_url.into() }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.display.tz()?, config.order_api.link_base_url.clone()))
    }

    pub fn with_limits(mut self, limits: DisplayLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> DisplayLimits {
        self.limits
    }

    pub fn link_base_url(&self) -> &str {
        &self.link_base_url
    }

    pub fn present(&self, order: &Order) -> Result<DisplayModel, PresentError> {
        let title = format!("Pedido #{}", order.id);
        let description = describe(order);
        self.check_lengths(&title, &description)?;

        Ok(DisplayModel {
            title,
            description,
            color: Color::for_status(order.status),
            footer: format!("Data da compra: {}", self.purchase_date(order)),
        })
    }

    pub fn link_for(&self, order: &Order) -> OrderLink {
        order_link(&self.link_base_url, &order.id)
    }

    pub fn link_reply(&self, link: &OrderLink) -> Option<String> {
        link_reply_text(&self.link_base_url, link)
    }

    pub(crate) fn check_lengths(&self, title: &str, description: &str) -> Result<(), PresentError> {
        let title_len = title.chars().count();
        if title_len > self.limits.title_chars {
            return Err(PresentError::TitleTooLong {
                len: title_len,
                limit: self.limits.title_chars,
            });
        }
        let description_len = description.chars().count();
        if description_len > self.limits.description_chars {
            return Err(PresentError::DescriptionTooLong {
                len: description_len,
                limit: self.limits.description_chars,
            });
        }
        Ok(())
    }

    fn purchase_date(&self, order: &Order) -> String {
        match order.created_at {
            Some(created_at) => {
                created_at.with_timezone(&self.timezone).format(FOOTER_DATE_FORMAT).to_string()
            }
            None => DATE_UNAVAILABLE.to_owned(),
        }
    }
}

fn describe(order: &Order) -> String {
    let packages = if order.packages.is_empty() {
        NO_PACKAGES.to_owned()
    } else {
        order
            .packages
            .iter()
            .map(|package| {
                format!(
                    "• *{}* ({}) — {}",
                    package.name,
                    package.kind.as_deref().unwrap_or(PACKAGE_TYPE_FALLBACK),
                    package.price_display
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "*Status:* {}\n*Cliente:* {}\n*Email:* {}\n*Valor:* {}\n*Método de Pagamento:* {}\n\n*Pacotes:*\n{}",
        order.status_display,
        order.client_name,
        order.client_email,
        order.price_display,
        order.gateway_display,
        packages
    )
}
