//! Shared record fixtures for engine tests.

#![allow(dead_code)]

use rowbind_engine::{
    record_fields, CascadeRule, Controller, EngineConfig, FieldDescriptor, GetQuery, Record,
    RecordDescriptor,
};

/// Installs a test subscriber honoring `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn controller() -> Controller {
    controller_with(EngineConfig::default())
}

pub fn controller_with(config: EngineConfig) -> Controller {
    init_tracing();
    Controller::open_in_memory(config).unwrap()
}

// =============================================================================
// PLAIN RECORDS
// =============================================================================

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub flags: i64,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub score: f64,
    pub active: bool,
    pub level: u32,
}

impl Record for User {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("User")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::int("Flags"))
            .field(FieldDescriptor::text("Name").required().len_range(2, 40))
            .field(FieldDescriptor::text("Email").unique().email())
            .field(FieldDescriptor::int("Age").value_range(0, 150))
            .field(FieldDescriptor::float("Score"))
            .field(FieldDescriptor::bool("Active"))
            .field(FieldDescriptor::uint("Level"))
            .field(FieldDescriptor::unsupported("LastSeen", "SystemTime"))
    }

    record_fields! {
        id => "ID",
        flags => "Flags",
        name => "Name",
        email => "Email",
        age => "Age",
        score => "Score",
        active => "Active",
        level => "Level",
    }
}

pub fn user(name: &str, age: i64) -> User {
    User {
        name: name.into(),
        email: format!("{}@example.com", name.to_lowercase()),
        age,
        score: age as f64 / 2.0,
        active: age % 2 == 0,
        level: 1,
        ..Default::default()
    }
}

// =============================================================================
// JOINED READ MODEL
// =============================================================================

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

impl Record for Team {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Team")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::text("Name"))
    }

    record_fields! { id => "ID", name => "Name" }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub team_id: i64,
}

impl Record for Member {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Member")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::text("Name"))
            .field(FieldDescriptor::int("TeamID"))
    }

    record_fields! { id => "ID", name => "Name", team_id => "TeamID" }
}

/// Members with their team name. Declared under the `Member` name so it
/// reads the `members` table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemberView {
    pub id: i64,
    pub name: String,
    pub team_id: i64,
    pub team_name: String,
}

impl Record for MemberView {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Member")
            .join::<Team>("Team")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::text("Name"))
            .field(FieldDescriptor::int("TeamID"))
            .field(FieldDescriptor::text("Team_Name"))
    }

    record_fields! {
        id => "ID",
        name => "Name",
        team_id => "TeamID",
        team_name => "Team_Name",
    }
}

/// Folders with their parent's name, joined through the same table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub parent_id: i64,
    pub parent_name: String,
}

impl Record for Folder {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Folder")
            .join::<Folder>("Parent")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::text("Name"))
            .field(FieldDescriptor::int("ParentID"))
            .field(FieldDescriptor::text("Parent_Name"))
    }

    record_fields! {
        id => "ID",
        name => "Name",
        parent_id => "ParentID",
        parent_name => "Parent_Name",
    }
}

// =============================================================================
// CASCADE CHAIN: Root → Leaf → Twig → Bud → Seed, with Notes on the side
// =============================================================================

macro_rules! chain_record {
    ($ty:ident, $name:literal, $parent:ident => $parent_name:literal, |$d:ident| $extra:expr) => {
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct $ty {
            pub id: i64,
            pub $parent: i64,
        }

        impl Record for $ty {
            fn describe() -> RecordDescriptor {
                let $d = RecordDescriptor::new($name)
                    .field(FieldDescriptor::int("ID"))
                    .field(FieldDescriptor::int($parent_name));
                $extra
            }

            record_fields! { id => "ID", $parent => $parent_name }
        }
    };
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Root {
    pub id: i64,
    pub name: String,
}

impl Record for Root {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Root")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::text("Name"))
            .children::<Leaf>("Leaves", CascadeRule::delete())
            .children::<Note>("Notes", CascadeRule::set_field("RootID", 0))
    }

    record_fields! { id => "ID", name => "Name" }
}

chain_record!(Leaf, "Leaf", root_id => "RootID", |d| d
    .children::<Twig>("Twigs", CascadeRule::delete()));
chain_record!(Twig, "Twig", leaf_id => "LeafID", |d| d
    .children::<Bud>("Buds", CascadeRule::delete())
    .children::<Note>("Notes", CascadeRule::set_field("TwigID", 0)));
chain_record!(Bud, "Bud", twig_id => "TwigID", |d| d
    .children::<Seed>("Seeds", CascadeRule::delete())
    .children::<Note>("Notes", CascadeRule::set_field("BudID", 0)));
chain_record!(Seed, "Seed", bud_id => "BudID", |d| d);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Note {
    pub id: i64,
    pub root_id: i64,
    pub twig_id: i64,
    pub bud_id: i64,
}

impl Record for Note {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Note")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::int("RootID"))
            .field(FieldDescriptor::int("TwigID"))
            .field(FieldDescriptor::int("BudID"))
    }

    record_fields! {
        id => "ID",
        root_id => "RootID",
        twig_id => "TwigID",
        bud_id => "BudID",
    }
}

/// Self-referential tree linked through `ParentID`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub parent_id: i64,
    pub label: String,
}

impl Record for Node {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Node")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::int("ParentID"))
            .field(FieldDescriptor::text("Label"))
            .children::<Node>("Nodes", CascadeRule::delete().via("ParentID"))
    }

    record_fields! { id => "ID", parent_id => "ParentID", label => "Label" }
}

pub fn cascade_controller(config: EngineConfig) -> Controller {
    let ctl = controller_with(config);
    create_cascade_tables(&ctl);
    ctl
}

pub fn create_cascade_tables(ctl: &Controller) {
    ctl.create_table::<Root>().unwrap();
    ctl.create_table::<Leaf>().unwrap();
    ctl.create_table::<Twig>().unwrap();
    ctl.create_table::<Bud>().unwrap();
    ctl.create_table::<Seed>().unwrap();
    ctl.create_table::<Note>().unwrap();
    ctl.create_table::<Node>().unwrap();
}

/// IDs of every stored `T`, ascending.
pub fn stored_ids<T: Record>(ctl: &Controller) -> Vec<i64> {
    ctl.get_with(
        &GetQuery::new().order(&["ID", "asc"]).limit(100_000),
        |record: T| record.id(),
    )
    .unwrap()
}
