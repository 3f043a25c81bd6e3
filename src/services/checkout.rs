//! Checkout session state machine. Session state is an explicit,
//! server-held object keyed by session id; concurrent sessions never share
//! mutable state.

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::leads::{CaptureLead, LeadService};
use crate::services::pricing::SelectionState;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// The three buyer-facing funnel stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Identification,
    Fulfillment,
    Settlement,
}

impl CheckoutStep {
    pub fn number(self) -> u8 {
        match self {
            Self::Identification => 1,
            Self::Fulfillment => 2,
            Self::Settlement => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Identification),
            2 => Some(Self::Fulfillment),
            3 => Some(Self::Settlement),
            _ => None,
        }
    }
}

/// Buyer identity and attribution collected at step 1.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

/// One buyer's checkout session.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub product_id: Uuid,
    pub step: CheckoutStep,
    pub customer: CustomerInfo,
    pub selection: SelectionState,
    /// Once-per-session lead capture guard
    pub lead_captured: bool,
    pub lead_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Sequences the funnel steps and fires the lead-capture side effect on the
/// first 1 → 2 advance with usable identity data.
#[derive(Clone)]
pub struct CheckoutService {
    sessions: Arc<DashMap<Uuid, CheckoutSession>>,
    leads: Arc<LeadService>,
    events: EventSender,
}

impl CheckoutService {
    pub fn new(leads: Arc<LeadService>, events: EventSender) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            leads,
            events,
        }
    }

    #[instrument(skip(self))]
    pub async fn start_session(&self, product_id: Uuid) -> CheckoutSession {
        let session = CheckoutSession {
            id: Uuid::new_v4(),
            product_id,
            step: CheckoutStep::Identification,
            customer: CustomerInfo::default(),
            selection: SelectionState::default(),
            lead_captured: false,
            lead_id: None,
            created_at: Utc::now(),
        };

        self.sessions.insert(session.id, session.clone());
        self.events
            .send(Event::CheckoutStarted {
                session_id: session.id,
                product_id,
            })
            .await;

        session
    }

    pub fn get(&self, session_id: Uuid) -> Result<CheckoutSession, ServiceError> {
        self.sessions
            .get(&session_id)
            .map(|s| s.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))
    }

    pub fn set_customer_info(
        &self,
        session_id: Uuid,
        customer: CustomerInfo,
    ) -> Result<CheckoutSession, ServiceError> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))?;
        entry.customer = customer;
        Ok(entry.clone())
    }

    pub fn select_shipping(
        &self,
        session_id: Uuid,
        index: usize,
    ) -> Result<CheckoutSession, ServiceError> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))?;
        entry.selection.shipping_index = index;
        Ok(entry.clone())
    }

    /// Toggle an order bump. Returns the session plus whether the bump is
    /// now selected.
    pub fn toggle_bump(
        &self,
        session_id: Uuid,
        bump_id: Uuid,
    ) -> Result<(CheckoutSession, bool), ServiceError> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))?;
        let selected = entry.selection.toggle_bump(bump_id);
        Ok((entry.clone(), selected))
    }

    /// Move the session to a step. Forward and backward navigation are both
    /// allowed; leaving the identification step triggers at most one lead
    /// capture per session, and a failed capture never blocks progression.
    #[instrument(skip(self))]
    pub async fn goto_step(
        &self,
        session_id: Uuid,
        step: CheckoutStep,
    ) -> Result<CheckoutSession, ServiceError> {
        let snapshot = {
            let mut entry = self.sessions.get_mut(&session_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Session {} not found", session_id))
            })?;
            entry.step = step;
            entry.clone()
        };

        if step > CheckoutStep::Identification
            && !snapshot.lead_captured
            && !snapshot.customer.name.trim().is_empty()
            && !snapshot.customer.phone.trim().is_empty()
        {
            self.capture_lead(&snapshot).await;
        }

        // Re-read: capture_lead may have updated the flag.
        self.get(session_id)
    }

    async fn capture_lead(&self, session: &CheckoutSession) {
        let input = CaptureLead {
            product_id: session.product_id,
            name: session.customer.name.clone(),
            phone: session.customer.phone.clone(),
            email: session.customer.email.clone(),
            step_abandoned: CheckoutStep::Identification.number() as i16,
            utm_source: session.customer.utm_source.clone(),
            utm_medium: session.customer.utm_medium.clone(),
            utm_campaign: session.customer.utm_campaign.clone(),
        };

        match self.leads.capture(input).await {
            Ok(lead) => {
                if let Some(mut entry) = self.sessions.get_mut(&session.id) {
                    entry.lead_captured = true;
                    entry.lead_id = Some(lead.id);
                }
                self.events
                    .send(Event::LeadCaptured {
                        lead_id: lead.id,
                        product_id: session.product_id,
                        step: CheckoutStep::Identification.number(),
                    })
                    .await;
            }
            Err(err) => {
                // Best-effort recovery signal; the funnel keeps moving.
                warn!(session_id = %session.id, %err, "lead capture failed");
            }
        }
    }
}
