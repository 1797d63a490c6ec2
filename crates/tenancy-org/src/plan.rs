//! Plan tiers and billing status
//!
//! The organization record carries the plan it is subscribed to and the
//! billing provider's view of that subscription. Checkout flows live outside
//! this workspace; these types only describe the stored values.

use serde::{Deserialize, Serialize};

/// Subscription plan for an organization.
///
/// # Examples
///
/// ```
/// use tenancy_org::PlanTier;
///
/// assert_eq!(PlanTier::default(), PlanTier::Free);
/// assert_eq!(PlanTier::parse("PRO"), Some(PlanTier::Pro));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// Free tier
    Free,

    /// Paid professional tier
    Pro,

    /// Custom enterprise contract
    Enterprise,
}

impl PlanTier {
    /// Parse tier from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "pro" => Some(Self::Pro),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    /// Get string representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    /// Whether the tier is paid for.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl Default for PlanTier {
    fn default() -> Self {
        Self::Free
    }
}

/// Billing status reported by the payment provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    /// Subscription is paid and current
    Active,

    /// Payment failed, grace period running
    PastDue,

    /// Subscription was canceled
    Canceled,

    /// Trial period
    Trialing,

    /// Invoices left unpaid after the grace period
    Unpaid,
}

impl BillingStatus {
    /// Parse status from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" => Some(Self::Canceled),
            "trialing" => Some(Self::Trialing),
            "unpaid" => Some(Self::Unpaid),
            _ => None,
        }
    }

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Trialing => "trialing",
            Self::Unpaid => "unpaid",
        }
    }

    /// Whether paid features should remain available.
    ///
    /// # Returns
    ///
    /// `true` for Active, Trialing and PastDue
    pub fn is_in_good_standing(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing | Self::PastDue)
    }
}

impl Default for BillingStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parse() {
        assert_eq!(PlanTier::parse("free"), Some(PlanTier::Free));
        assert_eq!(PlanTier::parse("Enterprise"), Some(PlanTier::Enterprise));
        assert_eq!(PlanTier::parse("team"), None);
        assert!(!PlanTier::Free.is_paid());
        assert!(PlanTier::Pro.is_paid());
    }

    #[test]
    fn test_billing_status() {
        assert_eq!(BillingStatus::parse("past_due"), Some(BillingStatus::PastDue));
        assert_eq!(BillingStatus::PastDue.as_str(), "past_due");
        assert!(BillingStatus::Trialing.is_in_good_standing());
        assert!(!BillingStatus::Unpaid.is_in_good_standing());
        assert!(!BillingStatus::Canceled.is_in_good_standing());
    }
}
