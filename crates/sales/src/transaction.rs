use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sportshub_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money};
use sportshub_events::Event;
use sportshub_inventory::ItemId;

use crate::payment::PaymentMethod;

/// Stream type for sale transaction aggregates in the event store.
pub const SALE_AGGREGATE_TYPE: &str = "sales.transaction";

/// UUIDv5 namespace for invoice-derived sale ids.
const INVOICE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d55_8e2a_5b7c_0d9e_41a3);

/// Sale transaction identifier.
///
/// Derived from the invoice number, so one invoice maps to exactly one stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub AggregateId);

impl SaleId {
    /// Stream id for an invoice number (surrounding whitespace ignored).
    pub fn for_invoice(invoice_number: &str) -> Self {
        Self(AggregateId::from_name(&INVOICE_NAMESPACE, invoice_number.trim()))
    }
}

impl core::fmt::Display for SaleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Sale line: item, quantity and the unit price charged at sale time.
///
/// The price is a snapshot; later item price edits never change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl SaleLine {
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price.checked_times(self.quantity).ok_or_else(|| {
            DomainError::validation(format!("line total for item {} is too large", self.item_id))
        })
    }
}

/// Sum of all line totals.
pub fn sale_total(lines: &[SaleLine]) -> Result<Money, DomainError> {
    let mut total = Money::ZERO;
    for line in lines {
        total = total
            .checked_add(line.line_total()?)
            .ok_or_else(|| DomainError::validation("sale total is too large"))?;
    }
    Ok(total)
}

/// Units demanded per item, summed across lines and ordered by item id.
pub fn demand_by_item(lines: &[SaleLine]) -> Result<BTreeMap<ItemId, i64>, DomainError> {
    let mut demand: BTreeMap<ItemId, i64> = BTreeMap::new();
    for line in lines {
        let slot = demand.entry(line.item_id).or_insert(0);
        *slot = slot.checked_add(line.quantity).ok_or_else(|| {
            DomainError::validation(format!("total quantity for item {} is too large", line.item_id))
        })?;
    }
    Ok(demand)
}

/// Unvalidated sale request as received from a register.
///
/// Fields stay raw so validation can run in a fixed order: invoice, payment
/// method, lines, item existence, stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub invoice_number: String,
    pub payment_method: String,
    pub lines: Vec<SaleLineRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineRequest {
    pub item_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl SaleRequest {
    /// Trimmed invoice number; blank is a validation error.
    pub fn invoice_number(&self) -> Result<&str, DomainError> {
        let invoice = self.invoice_number.trim();
        if invoice.is_empty() {
            return Err(DomainError::validation("invoice number cannot be empty"));
        }
        Ok(invoice)
    }

    pub fn payment_method(&self) -> Result<PaymentMethod, DomainError> {
        self.payment_method.parse()
    }

    /// Shape checks for every line: non-empty, quantity ≥ 1, price > 0, valid id.
    /// Per-item demand and the sale total must also fit their types.
    pub fn parse_lines(&self) -> Result<Vec<SaleLine>, DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("a sale needs at least one line"));
        }

        let lines = self
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let line_no = idx + 1;
                if line.quantity < 1 {
                    return Err(DomainError::validation(format!(
                        "line {line_no}: quantity must be at least 1"
                    )));
                }
                if !line.unit_price.is_positive() {
                    return Err(DomainError::validation(format!(
                        "line {line_no}: unit price must be positive"
                    )));
                }
                let item_id = line.item_id.parse::<ItemId>().map_err(|_| {
                    DomainError::validation(format!(
                        "line {line_no}: invalid item id '{}'",
                        line.item_id.trim()
                    ))
                })?;
                Ok(SaleLine {
                    item_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        demand_by_item(&lines)?;
        sale_total(&lines)?;
        Ok(lines)
    }
}

/// Aggregate root: SaleTransaction. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleTransaction {
    id: SaleId,
    invoice_number: String,
    payment_method: PaymentMethod,
    lines: Vec<SaleLine>,
    total: Money,
    recorded_at: DateTime<Utc>,
    version: u64,
    created: bool,
}

impl SaleTransaction {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SaleId) -> Self {
        Self {
            id,
            invoice_number: String::new(),
            payment_method: PaymentMethod::Cash,
            lines: Vec::new(),
            total: Money::ZERO,
            recorded_at: DateTime::<Utc>::UNIX_EPOCH,
            version: 0,
            created: false,
        }
    }

    pub fn from_recorded(event: &SaleRecorded) -> Self {
        let mut tx = Self::empty(event.sale_id);
        tx.apply(&SaleEvent::SaleRecorded(event.clone()));
        tx
    }

    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for SaleTransaction {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordSale (already shape-validated lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSale {
    pub sale_id: SaleId,
    pub invoice_number: String,
    pub payment_method: PaymentMethod,
    pub lines: Vec<SaleLine>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleCommand {
    RecordSale(RecordSale),
}

/// Event: SaleRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecorded {
    pub sale_id: SaleId,
    pub invoice_number: String,
    pub payment_method: PaymentMethod,
    pub lines: Vec<SaleLine>,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    SaleRecorded(SaleRecorded),
}

impl Event for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SaleRecorded(_) => "sales.transaction.recorded",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleEvent::SaleRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SaleTransaction {
    type Command = SaleCommand;
    type Event = SaleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SaleEvent::SaleRecorded(e) => {
                self.id = e.sale_id;
                self.invoice_number = e.invoice_number.clone();
                self.payment_method = e.payment_method;
                self.lines = e.lines.clone();
                self.total = e.total;
                self.recorded_at = e.occurred_at;
                self.created = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SaleCommand::RecordSale(cmd) => self.handle_record(cmd),
        }
    }
}

impl SaleTransaction {
    fn handle_record(&self, cmd: &RecordSale) -> Result<Vec<SaleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::duplicate_invoice(self.invoice_number.clone()));
        }

        let invoice = cmd.invoice_number.trim();
        if invoice.is_empty() {
            return Err(DomainError::validation("invoice number cannot be empty"));
        }
        if cmd.sale_id != SaleId::for_invoice(invoice) || self.id != cmd.sale_id {
            return Err(DomainError::invariant("sale_id does not match invoice number"));
        }

        if cmd.lines.is_empty() {
            return Err(DomainError::validation("a sale needs at least one line"));
        }
        for (idx, line) in cmd.lines.iter().enumerate() {
            if line.quantity < 1 {
                return Err(DomainError::validation(format!(
                    "line {}: quantity must be at least 1",
                    idx + 1
                )));
            }
            if !line.unit_price.is_positive() {
                return Err(DomainError::validation(format!(
                    "line {}: unit price must be positive",
                    idx + 1
                )));
            }
        }

        let total = sale_total(&cmd.lines)?;

        Ok(vec![SaleEvent::SaleRecorded(SaleRecorded {
            sale_id: cmd.sale_id,
            invoice_number: invoice.to_string(),
            payment_method: cmd.payment_method,
            total,
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
