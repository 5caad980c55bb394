// Payload assembler
//
// Pure mapping from the draft (plus the account's domains) to the campaign write body. The same
// function feeds the review step's preview and the actual submit.

use crate::models::draft::{CampaignDraft, RecipientTarget, SendAction};
use crate::models::requests::{
    CampaignContent, CampaignOptions, CampaignPayload, CampaignRecipients, CampaignStatus,
    ALL_CONTACTS_SEGMENT,
};
use crate::models::responses::Domain;
use crate::utils::validation::{format_mailbox, local_to_utc_iso, parse_mailbox};

/// Default sending address: the default sender of the first verified domain, or empty.
pub fn resolve_sender_email(domains: &[Domain]) -> String {
    domains
        .iter()
        .find(|d| d.is_verified())
        .and_then(|d| d.default_sender.as_deref())
        .and_then(parse_mailbox)
        .map(|m| m.email)
        .unwrap_or_default()
}

/// Reply-To header, or empty when disabled/incomplete. Always sent, never omitted.
pub fn reply_to_header(draft: &CampaignDraft) -> String {
    if !draft.enable_reply_to {
        return String::new();
    }
    let prefix = draft.reply_to_prefix.trim();
    let domain = draft.reply_to_domain.trim();
    if prefix.is_empty() || domain.is_empty() {
        return String::new();
    }
    format_mailbox(&draft.reply_to_name, &format!("{}@{}", prefix, domain))
}

pub fn recipients_for(draft: &CampaignDraft) -> CampaignRecipients {
    match draft.recipient_target {
        RecipientTarget::All => CampaignRecipients {
            list_names: Vec::new(),
            segment_names: vec![ALL_CONTACTS_SEGMENT.to_string()],
        },
        RecipientTarget::List => CampaignRecipients {
            list_names: draft.recipients.list_names.clone(),
            segment_names: Vec::new(),
        },
        RecipientTarget::Segment => CampaignRecipients {
            list_names: Vec::new(),
            segment_names: draft.recipients.segment_names.clone(),
        },
        RecipientTarget::None => CampaignRecipients::default(),
    }
}

/// `Active` only when actually sending to a non-empty selection. A send attempt with nothing
/// selected is saved as `Draft`.
pub fn status_for(draft: &CampaignDraft) -> CampaignStatus {
    if draft.send_action.is_sending() && draft.has_recipients() {
        CampaignStatus::Active
    } else {
        CampaignStatus::Draft
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

pub fn assemble(draft: &CampaignDraft, domains: &[Domain]) -> CampaignPayload {
    let sender = resolve_sender_email(domains);

    let schedule_for = match (draft.send_action, draft.schedule_date_time.as_deref()) {
        (SendAction::Schedule, Some(local)) => local_to_utc_iso(local).ok(),
        _ => None,
    };

    CampaignPayload {
        name: non_empty(&draft.campaign_name),
        status: status_for(draft),
        content: vec![CampaignContent {
            from: format_mailbox(&draft.from_name, &sender),
            reply_to: reply_to_header(draft),
            subject: non_empty(&draft.subject),
            template_name: draft.template.as_deref().and_then(non_empty),
            utm: draft.utm_enabled.then(|| draft.utm.clone()),
            body: None,
        }],
        recipients: recipients_for(draft),
        options: CampaignOptions {
            track_opens: draft.track_opens,
            track_clicks: draft.track_clicks,
            delivery_optimization: draft.delivery_optimization,
            enable_send_time_optimization: draft.enable_send_time_optimization,
            schedule_for,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::draft::{CampaignType, DraftPatch, RecipientCount, Recipients};
    use crate::models::draft::OptimizationChoice;
    use crate::models::requests::Utm;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn verified(domain: &str, sender: &str) -> Domain {
        Domain {
            domain: domain.to_string(),
            default_sender: Some(sender.to_string()),
            spf: json!("true"),
            dkim: json!("true"),
        }
    }

    fn scenario_draft() -> CampaignDraft {
        CampaignDraft {
            campaign_type: CampaignType::Regular,
            recipient_target: RecipientTarget::All,
            send_action: SendAction::Now,
            template: Some("T1".to_string()),
            from_name: "Jane".to_string(),
            subject: "Hi".to_string(),
            campaign_name: "Hi".to_string(),
            recipient_count: RecipientCount::Known(100),
            ..Default::default()
        }
    }

    fn to_value(p: &CampaignPayload) -> Value {
        serde_json::from_str(&p.to_json().unwrap()).unwrap()
    }

    #[test]
    fn all_contacts_send_now_is_active() {
        let domains = vec![verified("ex.com", "\"Jane Corp\" <mailer@ex.com>")];
        let p = assemble(&scenario_draft(), &domains);

        assert_eq!(p.content[0].from, "Jane <mailer@ex.com>");
        assert_eq!(p.recipients.list_names, Vec::<String>::new());
        assert_eq!(p.recipients.segment_names, vec!["All Contacts"]);
        assert_eq!(p.status, CampaignStatus::Active);
    }

    #[test]
    fn empty_list_selection_downgrades_to_draft() {
        let mut d = scenario_draft();
        d.recipient_target = RecipientTarget::List;
        d.recipients = Recipients::default();

        let p = assemble(&d, &[verified("ex.com", "mailer@ex.com")]);
        assert_eq!(p.status, CampaignStatus::Draft);
    }

    #[test]
    fn sending_without_any_selection_is_always_draft() {
        for action in [SendAction::Now, SendAction::Schedule] {
            for target in [RecipientTarget::None, RecipientTarget::List, RecipientTarget::Segment] {
                let d = CampaignDraft {
                    send_action: action,
                    recipient_target: target,
                    schedule_date_time: Some("2030-01-01T10:00".to_string()),
                    ..Default::default()
                };
                assert_eq!(
                    assemble(&d, &[]).status,
                    CampaignStatus::Draft,
                    "{:?}/{:?}",
                    action,
                    target
                );
            }
        }
    }

    #[test]
    fn save_for_later_is_draft_even_with_recipients() {
        let mut d = scenario_draft();
        d.send_action = SendAction::Later;
        assert_eq!(assemble(&d, &[]).status, CampaignStatus::Draft);
    }

    #[test]
    fn inapplicable_fields_are_absent_not_null() {
        let mut d = scenario_draft();
        d.template = None;
        d.subject = String::new();
        d.campaign_name = String::new();
        let v = to_value(&assemble(&d, &[]));

        assert!(v.get("Name").is_none());
        let content = &v["Content"][0];
        assert!(content.get("Subject").is_none());
        assert!(content.get("TemplateName").is_none());
        assert!(content.get("Utm").is_none());
        assert!(v["Options"].get("ScheduleFor").is_none());

        // Always-present fields.
        assert_eq!(content["ReplyTo"], json!(""));
        assert_eq!(content["Body"], Value::Null);
        assert_eq!(v["Recipients"]["ListNames"], json!([]));
    }

    #[test]
    fn schedule_only_with_schedule_action() {
        let mut d = scenario_draft();
        d.schedule_date_time = Some("2030-06-01T08:15".to_string());
        assert!(assemble(&d, &[]).options.schedule_for.is_none());

        d.send_action = SendAction::Schedule;
        let at = assemble(&d, &[]).options.schedule_for.unwrap();
        assert!(at.starts_with("2030-0"), "{}", at);
        assert!(at.ends_with('Z'));

        d.schedule_date_time = None;
        assert!(assemble(&d, &[]).options.schedule_for.is_none());
    }

    #[test]
    fn from_is_bare_email_without_name_and_empty_without_verified_domain() {
        let mut d = scenario_draft();
        d.from_name = "   ".to_string();
        let p = assemble(&d, &[verified("ex.com", "Corp <mailer@ex.com>")]);
        assert_eq!(p.content[0].from, "mailer@ex.com");

        let unverified = Domain {
            spf: json!("false"),
            ..verified("ex.com", "mailer@ex.com")
        };
        assert_eq!(resolve_sender_email(&[unverified]), "");
    }

    #[test]
    fn first_verified_domain_wins() {
        let unverified = Domain {
            dkim: json!("false"),
            ..verified("a.com", "first@a.com")
        };
        let domains = vec![unverified, verified("b.com", "second@b.com")];
        assert_eq!(resolve_sender_email(&domains), "second@b.com");
    }

    #[test]
    fn reply_to_only_when_enabled_and_complete() {
        let mut d = scenario_draft();
        d.merge(DraftPatch {
            enable_reply_to: Some(true),
            reply_to_name: Some("Support".into()),
            reply_to_prefix: Some("help".into()),
            reply_to_domain: Some("ex.com".into()),
            ..Default::default()
        });
        assert_eq!(assemble(&d, &[]).content[0].reply_to, "Support <help@ex.com>");

        d.reply_to_domain.clear();
        assert_eq!(assemble(&d, &[]).content[0].reply_to, "");
    }

    #[test]
    fn utm_only_when_enabled() {
        let mut d = scenario_draft();
        d.utm = Utm {
            source: "megamail".into(),
            medium: "email".into(),
            campaign: "spring".into(),
            content: "hero".into(),
        };
        assert!(assemble(&d, &[]).content[0].utm.is_none());

        d.utm_enabled = true;
        let v = to_value(&assemble(&d, &[]));
        assert_eq!(v["Content"][0]["Utm"]["Source"], "megamail");
        assert_eq!(v["Content"][0]["Utm"]["Content"], "hero");
    }

    #[test]
    fn list_and_segment_targets_map_their_names() {
        let mut d = scenario_draft();
        d.merge(DraftPatch {
            recipient_target: Some(RecipientTarget::Segment),
            recipients: Some(Recipients::segments(&["Engaged"])),
            ..Default::default()
        });
        let r = recipients_for(&d);
        assert!(r.list_names.is_empty());
        assert_eq!(r.segment_names, vec!["Engaged"]);
    }

    #[test]
    fn options_carry_tracking_and_optimization() {
        let mut d = scenario_draft();
        d.track_clicks = false;
        d.merge(DraftPatch::optimization(
            OptimizationChoice::Engaged,
        ));
        let v = to_value(&assemble(&d, &[]));
        assert_eq!(v["Options"]["TrackOpens"], true);
        assert_eq!(v["Options"]["TrackClicks"], false);
        assert_eq!(v["Options"]["DeliveryOptimization"], "ToEngagedFirst");
        assert_eq!(v["Options"]["EnableSendTimeOptimization"], false);
    }

    fn target() -> impl Strategy<Value = RecipientTarget> {
        prop_oneof![
            Just(RecipientTarget::None),
            Just(RecipientTarget::All),
            Just(RecipientTarget::List),
            Just(RecipientTarget::Segment),
        ]
    }

    fn send_action() -> impl Strategy<Value = SendAction> {
        prop_oneof![
            Just(SendAction::Now),
            Just(SendAction::Schedule),
            Just(SendAction::Later),
        ]
    }

    fn optimization() -> impl Strategy<Value = OptimizationChoice> {
        prop_oneof![
            Just(OptimizationChoice::None),
            Just(OptimizationChoice::Engaged),
            Just(OptimizationChoice::Optimal),
        ]
    }

    fn schedule() -> impl Strategy<Value = Option<String>> {
        prop::option::of(prop_oneof![
            "2030-0[1-9]-1[0-9]T1[0-9]:[0-5][0-9]",
            "[a-z ]{0,6}",
        ])
    }

    /// Drafts as the wizard produces them: arbitrary edits applied through `merge`.
    fn draft() -> impl Strategy<Value = CampaignDraft> {
        let audience = (
            target(),
            prop::collection::vec("[A-C]", 0..3),
            prop::collection::vec("[X-Z]", 0..3),
            send_action(),
            schedule(),
        );
        let content = (
            prop::option::of("[ T0-9]{0,3}"),
            "[ a-zA-Z]{0,6}",
            "[ a-z]{0,6}",
            "[ a-z]{0,6}",
            any::<bool>(),
            "[a-z]{0,4}",
            "[a-z.]{0,6}",
        );
        let options = (any::<bool>(), any::<bool>(), optimization(), any::<bool>());

        (audience, content, options).prop_map(
            |(
                (target, lists, segments, action, when),
                (template, from_name, subject, name, reply, prefix, domain),
                (opens, clicks, choice, utm_enabled),
            )| {
                let mut d = CampaignDraft::default();
                d.merge(DraftPatch {
                    campaign_type: Some(CampaignType::Regular),
                    recipient_target: Some(target),
                    recipients: Some(Recipients {
                        list_names: lists,
                        segment_names: segments,
                    }),
                    template: Some(template),
                    from_name: Some(from_name),
                    subject: Some(subject),
                    campaign_name: Some(name),
                    enable_reply_to: Some(reply),
                    reply_to_prefix: Some(prefix),
                    reply_to_domain: Some(domain),
                    track_opens: Some(opens),
                    track_clicks: Some(clicks),
                    utm_enabled: Some(utm_enabled),
                    send_action: Some(action),
                    schedule_date_time: Some(when),
                    ..Default::default()
                });
                d.merge(DraftPatch::optimization(choice));
                d
            },
        )
    }

    fn account_domains() -> impl Strategy<Value = Vec<Domain>> {
        prop::collection::vec(
            (any::<bool>(), "[a-z]{1,4}").prop_map(|(ok, local)| {
                let mut d = verified("ex.com", &format!("{}@ex.com", local));
                if !ok {
                    d.dkim = json!("false");
                }
                d
            }),
            0..3,
        )
    }

    proptest! {
        #[test]
        fn sending_to_an_empty_selection_is_draft(d in draft(), domains in account_domains()) {
            if d.send_action.is_sending() && !d.has_recipients() {
                prop_assert_eq!(assemble(&d, &domains).status, CampaignStatus::Draft);
            }
        }

        #[test]
        fn assemble_twice_is_byte_identical(d in draft(), domains in account_domains()) {
            let a = assemble(&d, &domains).to_json().unwrap();
            let b = assemble(&d, &domains).to_json().unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn inapplicable_fields_are_never_serialized(d in draft(), domains in account_domains()) {
            let v = to_value(&assemble(&d, &domains));
            let content = &v["Content"][0];
            let options = &v["Options"];

            prop_assert_eq!(v.get("Name").is_some(), !d.campaign_name.trim().is_empty());
            prop_assert_eq!(content.get("Subject").is_some(), !d.subject.trim().is_empty());
            prop_assert_eq!(content.get("Utm").is_some(), d.utm_enabled);
            prop_assert_eq!(
                content.get("TemplateName").is_some(),
                d.template.as_deref().is_some_and(|t| !t.trim().is_empty())
            );
            if d.send_action != SendAction::Schedule {
                prop_assert!(options.get("ScheduleFor").is_none());
            }
            prop_assert!(content.get("ReplyTo").is_some_and(Value::is_string));

            // `Body` is the one field modeled as always-present null.
            for (key, value) in v.as_object().unwrap().iter()
                .chain(content.as_object().unwrap().iter())
                .chain(options.as_object().unwrap().iter())
            {
                if key != "Body" {
                    prop_assert!(!value.is_null(), "{} serialized as null", key);
                }
            }
        }
    }
}
