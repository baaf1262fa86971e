use form_spec::{
    FieldValue, FormEvent, FormOptions, FormSchema, FormSession, InlineScope, RenderStatus,
    RenderWidget, WidgetInput, render_card, render_json_ui, render_text,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "demo_form" => include_str!("../tests/fixtures/demo_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn demo_session() -> FormSession {
    let schema = FormSchema::from_json_str(fixture("demo_form")).expect("deserialize");
    FormSession::new(schema, FormOptions::default()).expect("session")
}

#[test]
fn flatten_preserves_group_then_field_order() {
    let schema = FormSchema::from_json_str(fixture("demo_form")).expect("deserialize");
    let names = schema
        .flatten()
        .into_iter()
        .map(|field| field.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "requester",
            "department",
            "tags",
            "needed_by",
            "budget",
            "quotes",
            "internal_ref",
            "signature",
            "items",
        ]
    );
}

#[test]
fn hidden_and_unknown_fields_are_left_out() {
    let payload = demo_session().render();
    assert_eq!(payload.title, "Purchase Request");
    assert_eq!(payload.status, RenderStatus::Editing);
    let names = payload
        .fields
        .iter()
        .map(|field| field.name.as_str())
        .collect::<Vec<_>>();
    assert!(!names.contains(&"internal_ref"));
    assert!(!names.contains(&"signature"));
    assert_eq!(names.len(), 7);

    let spans = payload
        .fields
        .iter()
        .map(|field| field.span)
        .collect::<Vec<_>>();
    assert_eq!(spans, vec![2, 2, 2, 2, 2, 4, 4]);
}

#[test]
fn render_text_packs_rows_by_span() {
    let mut session = demo_session();
    session
        .input("requester", WidgetInput::Text("Ada".into()))
        .expect("input");
    let text = render_text(&session.render());

    assert!(text.contains("Form: Purchase Request"));
    assert!(text.contains("Status: editing"));
    assert!(text.contains("- Requester [requester, span 2] * = Ada"));
    assert!(text.contains("choose from: Finance / Engineering / Operations"));
    assert!(text.contains("Row 5:"));
    assert!(!text.contains("Row 6:"));
}

#[test]
fn render_json_ui_exposes_structure() {
    let mut session = demo_session();
    session
        .input("department", WidgetInput::Choice(Some("eng".into())))
        .expect("select");
    let ui = render_json_ui(&session.render());

    assert_eq!(ui["title"], "Purchase Request");
    assert_eq!(ui["columns"], 4);
    let fields = ui["fields"].as_array().expect("fields array");
    let department = fields
        .iter()
        .find(|field| field["name"] == "department")
        .expect("department");
    assert_eq!(department["type"], "select");
    assert_eq!(department["value"]["label"], "Engineering");
    assert_eq!(department["clearable"], true);

    let items = fields
        .iter()
        .find(|field| field["name"] == "items")
        .expect("items");
    assert_eq!(items["type"], "inline_group");
    assert_eq!(items["groups"][0]["fields"].as_array().map(Vec::len), Some(3));
    assert!(items["table"].is_null());
}

#[test]
fn inline_entries_show_up_as_a_table() {
    let mut session = demo_session();
    session
        .input("item", WidgetInput::Text("Laptop".into()))
        .expect("item");
    session
        .input("quantity", WidgetInput::Text("2".into()))
        .expect("quantity");
    session
        .input("unit", WidgetInput::Choice(Some("pc".into())))
        .expect("unit");
    assert_eq!(session.add_entry("items", 0).expect("add"), 0);
    assert_eq!(session.store().read("item"), Some(&FieldValue::Empty));

    let payload = session.render();
    let items = payload
        .fields
        .iter()
        .find(|field| field.name == "items")
        .expect("items");
    match &items.widget {
        RenderWidget::InlineGroup { table, .. } => {
            let table = table.as_ref().expect("table");
            assert_eq!(table.columns.len(), 3);
            assert_eq!(
                table.rows,
                vec![vec!["Laptop".to_string(), "2".to_string(), "pc".to_string()]]
            );
        }
        other => panic!("unexpected widget {:?}", other),
    }

    let text = render_text(&payload);
    assert!(text.contains("Entries: # | Item | Quantity | Unit"));
    assert!(text.contains("0 | Laptop | 2 | pc"));
}

#[test]
fn per_group_scope_renders_tables_inside_groups() {
    let schema = FormSchema::from_json_str(fixture("demo_form")).expect("deserialize");
    let options = FormOptions {
        inline_scope: InlineScope::PerGroup,
        ..FormOptions::default()
    };
    let mut session = FormSession::new(schema, options).expect("session");
    session
        .input("item", WidgetInput::Text("Desk".into()))
        .expect("item");
    session.add_entry("items", 0).expect("add");

    let ui = render_json_ui(&session.render());
    let items = ui["fields"]
        .as_array()
        .and_then(|fields| fields.iter().find(|field| field["name"] == "items"))
        .expect("items");
    assert!(items["table"].is_null());
    assert_eq!(items["groups"][0]["table"]["rows"][0][0], "Desk");
}

#[test]
fn render_card_includes_submit_and_add_actions() {
    let card = render_card(&demo_session().render());
    assert_eq!(card["version"], "1.3");
    assert_eq!(card["type"], "AdaptiveCard");

    let actions = card["actions"].as_array().expect("actions");
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0]["data"]["event"], "add_entry");
    assert_eq!(actions[0]["data"]["field"], "items");
    assert_eq!(actions[0]["data"]["group"], 0);
    assert_eq!(actions[1]["type"], "Action.Submit");
    assert_eq!(actions[1]["data"]["event"], "submit");
}

#[test]
fn render_card_offers_a_delete_per_entry() {
    let mut session = demo_session();
    for item in ["Desk", "Lamp"] {
        session
            .input("item", WidgetInput::Text(item.into()))
            .expect("item");
        session.add_entry("items", 0).expect("add");
    }

    let card = render_card(&session.render());
    let body = card["body"].as_array().expect("body");
    let items = body
        .iter()
        .find(|item| item["id"] == "9")
        .expect("items container");
    let action_set = items["items"]
        .as_array()
        .and_then(|elements| elements.iter().find(|element| element["type"] == "ActionSet"))
        .expect("delete buttons");
    let deletes = action_set["actions"].as_array().expect("actions");
    assert_eq!(deletes.len(), 2);
    assert_eq!(deletes[1]["data"]["event"], "delete_entry");
    assert_eq!(deletes[1]["data"]["field"], "items");
    assert_eq!(deletes[1]["data"]["group"], 0);
    assert_eq!(deletes[1]["data"]["index"], 1);

    let event: FormEvent = serde_json::from_value(deletes[1]["data"].clone()).expect("event");
    session.apply(event).expect("delete");
    let table = render_text(&session.render());
    assert!(table.contains("0 | Desk"));
    assert!(!table.contains("Lamp"));
}

#[test]
fn render_card_uses_choice_input_for_selects() {
    let card = render_card(&demo_session().render());
    let body = card["body"].as_array().expect("body");
    let department = body
        .iter()
        .find(|item| item["id"] == "2")
        .expect("department container");
    let input = &department["items"][1];
    assert_eq!(input["type"], "Input.ChoiceSet");
    assert_eq!(input["choices"][1]["value"], "eng");
    assert_eq!(input["isRequired"], true);
}

#[test]
fn failed_submit_marks_the_payload_invalid() {
    let mut session = demo_session();
    assert!(session.submit().is_err());
    let payload = session.render();
    assert_eq!(payload.status, RenderStatus::Invalid);

    let text = render_text(&payload);
    assert!(text.contains("Status: invalid"));
    assert!(text.contains("missing required requester, department, items"));

    let card = render_card(&payload);
    assert_eq!(card["body"][1]["color"], "Attention");
}
