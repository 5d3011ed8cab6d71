use crate::domain::models::{
    CrisisEscalation, NewNotification, NOTIFICATION_CRISIS_ALERT, SENDER_SYSTEM,
};
use uuid::Uuid;

pub fn escalation_link(escalation_id: Uuid) -> String {
    format!("/admin/crisis-escalations/{}", escalation_id)
}

/// One unread crisis alert per recipient, in recipient order.
pub fn build_crisis_alerts(
    escalation: &CrisisEscalation,
    recipients: &[String],
) -> Vec<NewNotification> {
    let title = format!("Crisis Alert: {}", escalation.severity.to_uppercase());
    let message = format!(
        "A {} crisis escalation was raised by {}. Review and respond immediately.",
        escalation.severity, escalation.trigger_source
    );
    let link = escalation_link(escalation.id);

    recipients
        .iter()
        .map(|recipient| NewNotification {
            recipient_id: recipient.clone(),
            sender_type: SENDER_SYSTEM.to_string(),
            notification_type: NOTIFICATION_CRISIS_ALERT.to_string(),
            title: title.clone(),
            message: message.clone(),
            link: link.clone(),
            read: false,
        })
        .collect()
}

/// Drops repeated ids, keeping the first occurrence.
pub fn unique_recipients(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter(|id| !id.trim().is_empty() && seen.insert(id.clone()))
        .collect()
}
