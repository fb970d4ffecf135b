use crate::query::{
    Accumulator, Filter, FindOptions, Group, GroupId, IndexSpec, Order, SortSpec, Stage, UpdateDoc,
};

pub const FICTION: &str = "Fiction";
pub const PUBLISHED_AFTER: i32 = 1940;
pub const AUTHOR: &str = "George Orwell";
pub const REPRICED_TITLE: &str = "1984";
pub const NEW_PRICE: f64 = 15.99;
pub const DELETED_TITLE: &str = "Moby Dick";
pub const IN_STOCK_AFTER: i32 = 1930;
pub const PAGE_SIZE: usize = 5;

/// One step of the fixed script.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Find { heading: String, filter: Filter, options: FindOptions },
    /// Updates one record, then re-reads it.
    UpdateOne { heading: String, filter: Filter, update: UpdateDoc },
    /// Deletes one record, then looks it up again.
    DeleteOne { heading: String, filter: Filter },
    Aggregate { heading: String, pipeline: Vec<Stage> },
    CreateIndex { heading: String, index: IndexSpec },
    Explain { heading: String, filter: Filter },
}

impl Operation {
    #[must_use]
    pub fn heading(&self) -> &str {
        match self {
            Self::Find { heading, .. }
            | Self::UpdateOne { heading, .. }
            | Self::DeleteOne { heading, .. }
            | Self::Aggregate { heading, .. }
            | Self::CreateIndex { heading, .. }
            | Self::Explain { heading, .. } => heading,
        }
    }
}

fn find(heading: impl Into<String>, filter: Filter, options: FindOptions) -> Operation {
    Operation::Find { heading: heading.into(), filter, options }
}

fn count_by(id: GroupId) -> Group {
    Group { id, outputs: vec![("count".into(), Accumulator::Count)] }
}

/// The seventeen bookstore operations, in execution order.
#[must_use]
pub fn bookstore_script() -> Vec<Operation> {
    let page = |n: usize| {
        find(
            format!("Pagination (Page {}, {PAGE_SIZE} books):", n + 1),
            Filter::True,
            FindOptions::page(n * PAGE_SIZE, PAGE_SIZE),
        )
    };
    vec![
        // CRUD
        find(format!("Books in {FICTION} genre:"), Filter::eq("genre", FICTION), FindOptions::default()),
        find(
            format!("Books published after {PUBLISHED_AFTER}:"),
            Filter::gt("published_year", PUBLISHED_AFTER),
            FindOptions::default(),
        ),
        find(format!("Books by {AUTHOR}:"), Filter::eq("author", AUTHOR), FindOptions::default()),
        Operation::UpdateOne {
            heading: format!("Updating price of '{REPRICED_TITLE}'..."),
            filter: Filter::eq("title", REPRICED_TITLE),
            update: UpdateDoc::set("price", NEW_PRICE),
        },
        Operation::DeleteOne {
            heading: format!("Deleting book '{DELETED_TITLE}'..."),
            filter: Filter::eq("title", DELETED_TITLE),
        },
        // Advanced queries
        find(
            format!("Books in stock & published after {IN_STOCK_AFTER}:"),
            Filter::And(vec![
                Filter::eq("in_stock", true),
                Filter::gt("published_year", IN_STOCK_AFTER),
            ]),
            FindOptions::default(),
        ),
        find(
            "Projection (title, author, price only):",
            Filter::True,
            FindOptions::projected(&["title", "author", "price"]),
        ),
        find(
            "Books sorted by price (ascending):",
            Filter::True,
            FindOptions::sorted(vec![SortSpec::asc("price")]),
        ),
        find(
            "Books sorted by price (descending):",
            Filter::True,
            FindOptions::sorted(vec![SortSpec::desc("price")]),
        ),
        page(0),
        page(1),
        // Aggregation
        Operation::Aggregate {
            heading: "Average price by genre:".into(),
            pipeline: vec![Stage::Group(Group {
                id: GroupId::Field("genre".into()),
                outputs: vec![("avgPrice".into(), Accumulator::Avg("price".into()))],
            })],
        },
        Operation::Aggregate {
            heading: "Author with the most books:".into(),
            pipeline: vec![
                Stage::Group(count_by(GroupId::Field("author".into()))),
                Stage::Sort(vec![SortSpec::desc("count")]),
                Stage::Limit(1),
            ],
        },
        Operation::Aggregate {
            heading: "Books grouped by publication decade:".into(),
            pipeline: vec![
                Stage::Group(count_by(GroupId::Bucket {
                    field: "published_year".into(),
                    width: 10,
                })),
                Stage::Sort(vec![SortSpec::asc("_id")]),
            ],
        },
        // Indexing
        Operation::CreateIndex {
            heading: "Creating index on title...".into(),
            index: IndexSpec::single("title", Order::Asc),
        },
        Operation::CreateIndex {
            heading: "Creating compound index (author + published_year)...".into(),
            index: IndexSpec::compound(&[("author", Order::Asc), ("published_year", Order::Desc)]),
        },
        Operation::Explain {
            heading: "Explain query using title index:".into(),
            filter: Filter::eq("title", REPRICED_TITLE),
        },
    ]
}
