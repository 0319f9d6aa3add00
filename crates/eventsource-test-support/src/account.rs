//! A small bank-account domain used to exercise the repository end to end.

use eventsource_core::aggregate::{Aggregate, Applied};
use eventsource_core::context::Context;
use eventsource_core::error::BoxError;
use eventsource_core::event::{BaseEvent, Event};
use eventsource_core::serializer::JsonSerializer;
use serde::{Deserialize, Serialize};

pub const ACCOUNT_OPENED: &str = "AccountOpened";
pub const MONEY_DEPOSITED: &str = "MoneyDeposited";
pub const ACCOUNT_CLOSED: &str = "AccountClosed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOpened {
    #[serde(flatten)]
    pub base: BaseEvent,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyDeposited {
    #[serde(flatten)]
    pub base: BaseEvent,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountClosed {
    #[serde(flatten)]
    pub base: BaseEvent,
}

/// Every account event. Serialized without a tag; the record's type name
/// selects the variant on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AccountEvent {
    Opened(AccountOpened),
    Deposited(MoneyDeposited),
    Closed(AccountClosed),
}

impl AccountEvent {
    #[must_use]
    pub fn opened(aggregate_id: &str, user_id: &str, owner: &str) -> Self {
        Self::Opened(AccountOpened {
            base: BaseEvent::new(aggregate_id, user_id),
            owner: owner.to_owned(),
        })
    }

    #[must_use]
    pub fn deposited(aggregate_id: &str, user_id: &str, amount: i64) -> Self {
        Self::Deposited(MoneyDeposited {
            base: BaseEvent::new(aggregate_id, user_id),
            amount,
        })
    }

    #[must_use]
    pub fn closed(aggregate_id: &str, user_id: &str) -> Self {
        Self::Closed(AccountClosed {
            base: BaseEvent::new(aggregate_id, user_id),
        })
    }
}

impl From<AccountOpened> for AccountEvent {
    fn from(event: AccountOpened) -> Self {
        Self::Opened(event)
    }
}

impl From<MoneyDeposited> for AccountEvent {
    fn from(event: MoneyDeposited) -> Self {
        Self::Deposited(event)
    }
}

impl From<AccountClosed> for AccountEvent {
    fn from(event: AccountClosed) -> Self {
        Self::Closed(event)
    }
}

impl Event for AccountEvent {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Opened(_) => ACCOUNT_OPENED,
            Self::Deposited(_) => MONEY_DEPOSITED,
            Self::Closed(_) => ACCOUNT_CLOSED,
        }
    }

    fn base(&self) -> &BaseEvent {
        match self {
            Self::Opened(e) => &e.base,
            Self::Deposited(e) => &e.base,
            Self::Closed(e) => &e.base,
        }
    }

    fn base_mut(&mut self) -> &mut BaseEvent {
        match self {
            Self::Opened(e) => &mut e.base,
            Self::Deposited(e) => &mut e.base,
            Self::Closed(e) => &mut e.base,
        }
    }
}

/// A serializer that knows every account event.
#[must_use]
pub fn account_serializer() -> JsonSerializer<AccountEvent> {
    JsonSerializer::new()
        .register::<AccountOpened>(ACCOUNT_OPENED)
        .register::<MoneyDeposited>(MONEY_DEPOSITED)
        .register::<AccountClosed>(ACCOUNT_CLOSED)
}

/// Account state rebuilt from events. Closing the account is a soft delete;
/// a negative deposit is rejected.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub owner: String,
    pub balance: i64,
    pub applied: Vec<AccountEvent>,
}

impl Aggregate<AccountEvent> for Account {
    fn set_aggregate_id(&mut self, id: &str) {
        id.clone_into(&mut self.id);
    }

    fn on(&mut self, _ctx: &Context, event: &AccountEvent) -> Result<Applied, BoxError> {
        self.applied.push(event.clone());
        match event {
            AccountEvent::Opened(e) => {
                self.owner.clone_from(&e.owner);
                Ok(Applied::Continue)
            }
            AccountEvent::Deposited(e) if e.amount < 0 => {
                Err(format!("negative deposit of {}", e.amount).into())
            }
            AccountEvent::Deposited(e) => {
                self.balance += e.amount;
                Ok(Applied::Continue)
            }
            AccountEvent::Closed(_) => Ok(Applied::Deleted),
        }
    }
}
