use super::*;
use method_name::*;

#[test]
fn method_names_match_the_documented_dot_notation() {
    assert_eq!(MESSAGE_SEND, "message.send");
    assert_eq!(AGENT_LIST_CONTEXT, "agent.listContext");
    assert_eq!(GROUP_MEMBER_ADD, "group.member.add");
    assert_eq!(CONTEXT_PREAMBLE_SAVE, "context.preamble.save");
    assert_eq!(PEER_START_PAIRING, "peer.start_pairing");
}

#[test]
fn message_list_filter_defaults_to_page_one_and_descending() {
    let filter: MessageListFilter = serde_json::from_str("{}").unwrap();
    assert_eq!(filter.page, 1);
    assert_eq!(filter.page_size, 50);
    assert_eq!(filter.sort_order, SortOrder::Desc);
}

#[test]
fn register_status_round_trips_as_snake_case() {
    let encoded = serde_json::to_string(&RegisterStatus::Conflict).unwrap();
    assert_eq!(encoded, "\"conflict\"");
    let decoded: RegisterStatus = serde_json::from_str("\"updated\"").unwrap();
    assert_eq!(decoded, RegisterStatus::Updated);
}

#[test]
fn register_status_equality_is_derived() {
    assert_eq!(RegisterStatus::Registered, RegisterStatus::Registered);
    assert_ne!(RegisterStatus::Registered, RegisterStatus::Updated);
}
