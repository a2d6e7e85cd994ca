mod common;

use common::{controller, user, Folder, Member, MemberView, Team, User};
use pretty_assertions::assert_eq;
use rowbind_engine::{EngineError, FailureCode, Filters, GetQuery, Record, RegisterOptions};

#[test]
fn save_then_load_round_trips() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();

    let mut ada = user("Ada", 36);
    ada.flags = 0b101;
    ada.level = 7;
    ctl.save(&mut ada).unwrap();
    assert!(ada.id > 0);

    let mut loaded = User::default();
    assert!(ctl.load(&mut loaded, ada.id).unwrap());
    assert_eq!(loaded, ada);
}

#[test]
fn generated_ids_increase() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();

    let mut a = user("Ann", 20);
    let mut b = user("Bob", 30);
    ctl.save(&mut a).unwrap();
    ctl.save(&mut b).unwrap();
    assert!(b.id > a.id);
}

#[test]
fn load_missing_resets_to_default() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();

    let mut record = user("Ghost", 40);
    record.id = 12;
    assert!(!ctl.load(&mut record, 999).unwrap());
    assert_eq!(record, User::default());
}

#[test]
fn save_with_id_upserts() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();

    let mut ada = user("Ada", 36);
    ctl.save(&mut ada).unwrap();

    ada.age = 37;
    ada.active = true;
    ctl.save(&mut ada).unwrap();

    let mut loaded = User::default();
    ctl.load(&mut loaded, ada.id).unwrap();
    assert_eq!(loaded.age, 37);
    assert!(loaded.active);
    assert_eq!(ctl.get_count::<User>(&Default::default()).unwrap(), 1);

    // A caller-chosen ID inserts through the same path.
    let mut fixed = user("Fixed", 50);
    fixed.id = 500;
    ctl.save(&mut fixed).unwrap();
    let mut loaded = User::default();
    assert!(ctl.load(&mut loaded, 500).unwrap());
    assert_eq!(loaded.name, "Fixed");
}

#[test]
fn delete_resets_record_and_removes_row() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();

    let mut ada = user("Ada", 36);
    ctl.save(&mut ada).unwrap();
    let id = ada.id;

    ctl.delete(&mut ada).unwrap();
    assert_eq!(ada, User::default());

    let mut loaded = User::default();
    assert!(!ctl.load(&mut loaded, id).unwrap());
}

#[test]
fn delete_of_unsaved_or_absent_record_is_a_no_op() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();

    let mut unsaved = user("New", 1);
    ctl.delete(&mut unsaved).unwrap();
    assert_eq!(unsaved.name, "New");

    let mut absent = user("Gone", 2);
    absent.id = 4242;
    ctl.delete(&mut absent).unwrap();
    assert_eq!(absent, User::default());
}

#[test]
fn create_table_twice_fails() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();
    let err = ctl.create_table::<User>().unwrap_err();
    assert!(matches!(err, EngineError::Query { op: "create_table", .. }));
    assert!(!err.is_client_error());
}

#[test]
fn drop_table_allows_recreation() {
    let ctl = controller();
    ctl.drop_table::<User>().unwrap();
    ctl.create_table::<User>().unwrap();
    ctl.drop_table::<User>().unwrap();
    ctl.create_table::<User>().unwrap();
}

#[test]
fn validation_rejects_bad_records() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();

    let mut bad = User {
        name: "A".into(),
        email: "not-an-email".into(),
        age: 200,
        ..Default::default()
    };
    let err = ctl.save(&mut bad).unwrap_err();
    assert!(err.is_client_error());
    let EngineError::Validation { op, failures } = err else {
        panic!("expected validation error");
    };
    assert_eq!(op, "save");
    assert_eq!(failures.get("Name"), Some(&FailureCode::Lenmin));
    assert_eq!(failures.get("Email"), Some(&FailureCode::Email));
    assert_eq!(failures.get("Age"), Some(&FailureCode::Valmax));
    assert_eq!(bad.id, 0);

    let mut unnamed = User::default();
    let EngineError::Validation { failures, .. } = ctl.save(&mut unnamed).unwrap_err() else {
        panic!("expected validation error");
    };
    assert_eq!(failures.get("Name"), Some(&FailureCode::Req));
    // Empty optional strings are not checked against their format.
    assert_eq!(failures.get("Email"), None);
}

#[test]
fn unique_columns_are_enforced_by_the_database() {
    let ctl = controller();
    ctl.create_table::<User>().unwrap();

    ctl.save(&mut user("Ada", 36)).unwrap();
    let err = ctl.save(&mut user("Ada", 37)).unwrap_err();
    assert!(matches!(err, EngineError::Query { op: "save", .. }));
}

#[test]
fn registration_is_cached_and_overwritable() {
    let ctl = controller();
    let first = ctl.register::<User>().unwrap();
    let again = ctl.register::<User>().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &again));
    assert_eq!(first.schema.table_name(), "users");

    let kept = ctl
        .register_with::<User>(&RegisterOptions::default().table_name("people"), false)
        .unwrap();
    assert_eq!(kept.schema.table_name(), "users");

    let replaced = ctl
        .register_with::<User>(&RegisterOptions::default().table_name("people"), true)
        .unwrap();
    assert_eq!(replaced.schema.table_name(), "people");
    assert_eq!(ctl.get_schema::<User>().unwrap().table_name(), "people");
}

#[test]
fn read_model_joins_dependency_columns() {
    let ctl = controller();
    ctl.create_table::<Team>().unwrap();
    ctl.create_table::<Member>().unwrap();

    let mut red = Team {
        name: "red".into(),
        ..Default::default()
    };
    let mut blue = Team {
        name: "blue".into(),
        ..Default::default()
    };
    ctl.save(&mut red).unwrap();
    ctl.save(&mut blue).unwrap();
    for (name, team) in [("ann", &red), ("bob", &blue), ("cid", &red)] {
        let mut member = Member {
            name: name.into(),
            team_id: team.id,
            ..Default::default()
        };
        ctl.save(&mut member).unwrap();
    }

    let reds = ctl
        .get::<MemberView>(
            &GetQuery::new()
                .filters(Filters::new().eq("Team_Name", "red"))
                .order(&["Name", "desc"]),
        )
        .unwrap();
    let names: Vec<_> = reds.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["cid", "ann"]);
    assert!(reds.iter().all(|m| m.team_name == "red" && m.team_id == red.id));

    let mut view = MemberView::default();
    assert!(ctl.load(&mut view, reds[0].id).unwrap());
    assert_eq!(view.team_name, "red");
}

#[test]
fn self_joined_read_model_reads_parent_columns() {
    let ctl = controller();
    ctl.create_table::<Folder>().unwrap();

    let mut home = Folder {
        name: "home".into(),
        ..Default::default()
    };
    ctl.save(&mut home).unwrap();
    for name in ["pics", "docs"] {
        let mut child = Folder {
            name: name.into(),
            parent_id: home.id,
            ..Default::default()
        };
        ctl.save(&mut child).unwrap();
    }

    // The inner join leaves out folders without a stored parent.
    let children = ctl
        .get::<Folder>(&GetQuery::new().order(&["Name", "asc"]))
        .unwrap();
    let listed: Vec<_> = children
        .iter()
        .map(|f| (f.name.as_str(), f.parent_name.as_str()))
        .collect();
    assert_eq!(listed, [("docs", "home"), ("pics", "home")]);

    let mut docs = children[0].clone();
    docs.name = "papers".into();
    ctl.save(&mut docs).unwrap();
    let mut loaded = Folder::default();
    assert!(ctl.load(&mut loaded, docs.id).unwrap());
    assert_eq!(loaded.name, "papers");
    assert_eq!(loaded.parent_name, "home");
}

#[test]
fn record_ids_come_from_the_id_field() {
    let mut ada = user("Ada", 36);
    assert_eq!(ada.id(), 0);
    ada.set_id(9).unwrap();
    assert_eq!(ada.id, 9);
}
