//! Shared record fixtures for query tests.

#![allow(dead_code)]

use rowbind_query::QueryTemplates;
use rowbind_schema::{
    record_fields, FieldDescriptor, Record, RecordDescriptor, ReflectOptions, Schema,
};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TestStruct {
    pub id: i64,
    pub flags: i64,
    pub email: String,
    pub email_secondary: String,
    pub age: i64,
    pub price: f64,
    pub post_code2: String,
}

impl Record for TestStruct {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("TestStruct")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::int("Flags"))
            .field(FieldDescriptor::text("Email").unique().email())
            .field(FieldDescriptor::text("EmailSecondary"))
            .field(FieldDescriptor::int("Age"))
            .field(FieldDescriptor::float("Price"))
            .field(FieldDescriptor::text("PostCode2"))
    }

    record_fields! {
        id => "ID",
        flags => "Flags",
        email => "Email",
        email_secondary => "EmailSecondary",
        age => "Age",
        price => "Price",
        post_code2 => "PostCode2",
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub rank: i64,
}

impl Record for Category {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Category")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::text("Name"))
            .field(FieldDescriptor::int("Rank"))
    }

    record_fields! { id => "ID", name => "Name", rank => "Rank" }
}

/// Read model pulling the category name and rank into items.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub category_name: String,
    pub category_rank: i64,
}

impl Record for Item {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Item")
            .join::<Category>("Category")
            .field(FieldDescriptor::int("ID"))
            .field(FieldDescriptor::text("Name"))
            .field(FieldDescriptor::int("CategoryID"))
            .field(FieldDescriptor::text("Category_Name"))
            .field(FieldDescriptor::int("Category_Rank"))
    }

    record_fields! {
        id => "ID",
        name => "Name",
        category_id => "CategoryID",
        category_name => "Category_Name",
        category_rank => "Category_Rank",
    }
}

/// Categories with their parent's name, joined through the same table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CategoryTree {
    pub id: i64,
    pub name: String,
    pub parent_id: i64,
    pub parent_name: String,
}

impl Record for CategoryTree {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Category")
            .join::<CategoryTree>("Parent")
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

/// A record with nothing but its identifier.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Marker {
    pub id: i64,
}

impl Record for Marker {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Marker").field(FieldDescriptor::int("ID"))
    }

    record_fields! { id => "ID" }
}

pub fn schema_of<T: Record>() -> Schema {
    Schema::reflect(&T::describe(), &ReflectOptions::default()).unwrap()
}

pub fn compiled<T: Record>() -> (Schema, QueryTemplates) {
    let schema = schema_of::<T>();
    let templates = QueryTemplates::build(&schema);
    (schema, templates)
}

/// `$N` indices in order of appearance.
pub fn placeholder_indices(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                out.push(sql[start..end].parse().unwrap());
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }
    out
}
