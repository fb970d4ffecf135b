use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{
    CmpOp, Filter, MAX_PATH_DEPTH, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, Order, SortSpec,
    UpdateDoc,
};

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Cmp { path, op, value } => {
            let Some(v) = get_path(doc, path) else {
                return false;
            };
            if matches!(op, CmpOp::Eq) {
                return match (as_f64(v), as_f64(value)) {
                    (Some(x), Some(y)) => x == y,
                    _ => v == value,
                };
            }
            // Range operators only match values of the same kind, like the server.
            if !comparable(v, value) {
                return false;
            }
            let c = compare_bson(v, value);
            match op {
                CmpOp::Eq => c == Ordering::Equal,
                CmpOp::Gt => c == Ordering::Greater,
                CmpOp::Gte => c != Ordering::Less,
                CmpOp::Lt => c == Ordering::Less,
                CmpOp::Lte => c != Ordering::Greater,
            }
        }
    }
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let va = get_path(a, &s.field);
        let vb = get_path(b, &s.field);
        let ord = match (va, vb) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if matches!(s.order, Order::Asc) { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

pub(crate) fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 || path.split('.').count() > MAX_PATH_DEPTH {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

pub(crate) fn as_f64(x: &Bson) -> Option<f64> {
    match x {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        Bson::Decimal128(d) => d.to_string().parse::<f64>().ok(),
        _ => None,
    }
}

fn comparable(a: &Bson, b: &Bson) -> bool {
    (is_num(a) && is_num(b)) || type_rank(a) == type_rank(b)
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.total_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.cmp(y),
        (Bson::Null, Bson::Null) => Ordering::Equal,
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// Server sort order across types: null < numbers < strings < objects < ... < bool < dates.
fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::DbPointer(_) => 12,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 13,
        Bson::MaxKey => 255,
    }
}

/// Inclusion projection. `_id` is kept unless listed otherwise, as the server does.
pub fn project_fields(doc: &BsonDocument, fields: &[String]) -> BsonDocument {
    let mut out = BsonDocument::new();
    if let Some(id) = doc.get("_id") {
        out.insert("_id", id.clone());
    }
    for f in fields.iter().take(MAX_PROJECTION_FIELDS) {
        if let Some(v) = doc.get(f) {
            out.insert(f.clone(), v.clone());
        }
    }
    out
}

/// Applies a `$set` update in place. Returns whether anything changed.
pub fn apply_update(doc: &mut BsonDocument, upd: &UpdateDoc) -> bool {
    fn set_path(root: &mut BsonDocument, path: &str, value: Bson) -> bool {
        let mut cur = root;
        let mut iter = path.split('.').peekable();
        while let Some(seg) = iter.next() {
            if iter.peek().is_none() {
                let old = cur.insert(seg, value.clone());
                return old.as_ref() != Some(&value);
            }
            if !matches!(cur.get(seg), Some(Bson::Document(_))) {
                cur.insert(seg, BsonDocument::new());
            }
            cur = match cur.get_mut(seg) {
                Some(Bson::Document(d)) => d,
                _ => return false,
            };
        }
        false
    }

    let mut changed = false;
    for (k, v) in &upd.set {
        if set_path(doc, k, v.clone()) {
            changed = true;
        }
    }
    changed
}
