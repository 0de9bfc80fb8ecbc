//! End-to-end tests for `#[derive(Model)]` models.

use colprefix::prelude::*;
use colprefix::{SchemaNode, TypeKind};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[allow(dead_code)]
mod app {
    use colprefix::Model;

    #[derive(Model)]
    pub struct Address {
        #[db("id")]
        pub id: i64,
        #[db("city")]
        pub city: String,
    }

    pub struct Session {
        pub token: String,
    }

    /// Struct-valued column: no tagged fields of its own.
    #[derive(Model)]
    pub struct Money {
        pub cents: i64,
        #[db("-")]
        pub currency: String,
    }

    #[derive(Model)]
    pub struct User {
        #[db("id")]
        pub id: i64,
        #[db("name")]
        pub name: String,
        #[db("addr")]
        pub address: Address,
        #[db("-")]
        pub password_hash: String,
        pub session: Session,
    }

    #[derive(Model)]
    pub struct Geo {
        #[db("lat")]
        pub lat: f64,
        #[db("lng")]
        pub lng: f64,
    }

    #[derive(Model)]
    pub struct Warehouse {
        #[db("id")]
        pub id: i64,
        #[db("geo")]
        pub geo: Option<Box<Geo>>,
    }

    #[derive(Model)]
    pub struct Item {
        #[db("sku")]
        pub sku: String,
        #[db("price")]
        pub price: Money,
        #[db("wh")]
        pub warehouse: Warehouse,
    }

    #[derive(Model)]
    pub struct Order {
        #[db = "id"]
        pub id: i64,
        #[db("placed_at")]
        pub placed_at: chrono::NaiveDateTime,
        #[db("buyer")]
        pub buyer: Option<User>,
        #[db("items")]
        pub items: Vec<Option<Item>>,
        #[db("notes")]
        pub notes: Vec<String>,
        #[db("total")]
        pub total: Money,
    }

    #[derive(Model)]
    pub struct Basket {
        #[db("id")]
        pub id: i64,
        #[db("items")]
        pub items: Option<Vec<Item>>,
    }

    #[derive(Model)]
    pub struct SparseBasket {
        #[db("id")]
        pub id: i64,
        #[db("items")]
        pub items: Option<Vec<Option<Item>>>,
    }

    #[derive(Model)]
    pub struct Empty {
        pub nothing: i32,
    }
}

use app::{Address, Basket, Empty, Order, SparseBasket, User};

#[test]
fn test_scenario_without_directives() {
    let mut prefixer = Prefixer::new();
    assert_eq!(
        prefixer.columns::<User>("u", &[]).finalize(),
        "u.id, u.name, addr.id AS \"addr.id\", addr.city AS \"addr.city\""
    );
}

#[test]
fn test_scenario_with_alias_override() {
    let mut prefixer = Prefixer::new();
    assert_eq!(
        prefixer.columns::<User>("u", &[join("Address", "a")]).finalize(),
        "u.id, u.name, a.id AS \"addr.id\", a.city AS \"addr.city\""
    );
}

#[test]
fn test_scenario_unknown_directive() {
    let mut prefixer = Prefixer::new();
    assert_eq!(
        prefixer
            .columns::<User>("u", &[JoinDirective::new("Invoice")])
            .finalize(),
        "u.id, u.name"
    );
}

#[test]
fn test_deep_model_fully_recursive() {
    let mut prefixer = Prefixer::new();
    assert_eq!(
        prefixer.columns::<Order>("o", &[]).finalize(),
        "o.id, o.placed_at, \
         buyer.id AS \"buyer.id\", buyer.name AS \"buyer.name\", \
         addr.id AS \"buyer.addr.id\", addr.city AS \"buyer.addr.city\", \
         items.sku AS \"items.sku\", items.price AS \"items.price\", \
         wh.id AS \"items.wh.id\", \
         geo.lat AS \"items.wh.geo.lat\", geo.lng AS \"items.wh.geo.lng\", \
         o.notes, o.total"
    );
}

#[test]
fn test_deep_model_selective() {
    let mut prefixer = Prefixer::new();
    let joins = parse_directives("Item:i, Warehouse:w").unwrap();
    assert_eq!(
        prefixer.columns::<Order>("o", &joins).finalize(),
        "o.id, o.placed_at, i.sku AS \"items.sku\", i.price AS \"items.price\", \
         w.id AS \"items.wh.id\", o.notes, o.total"
    );
}

#[test]
fn test_optional_sequence_of_models_is_expanded() {
    let mut prefixer = Prefixer::new();
    let joins = [JoinDirective::new("Item")];
    let expected = "b.id, items.sku AS \"items.sku\", items.price AS \"items.price\"";

    assert_eq!(prefixer.columns::<Basket>("b", &joins).finalize(), expected);
    assert_eq!(prefixer.columns::<SparseBasket>("b", &joins).finalize(), expected);
}

#[test]
fn test_tag_exclusion_at_every_depth() {
    let mut prefixer = Prefixer::new();
    let columns = prefixer.columns::<Order>("o", &[]).finalize();
    for hidden in ["password_hash", "session", "currency", "cents"] {
        assert!(!columns.contains(hidden), "{hidden} leaked into {columns}");
    }
}

#[test]
fn test_struct_column_is_memoized_once() {
    let mut prefixer = Prefixer::new();
    prefixer.columns::<Order>("o", &[]).finalize();
    let after_first = prefixer.cache_stats();
    assert_eq!(after_first.excluded, 1);

    prefixer.columns::<Order>("o", &[]).finalize();
    let after_second = prefixer.cache_stats();
    assert_eq!(after_second.excluded, 1);
    assert_eq!(after_second.misses, 1);
    assert_eq!(after_second.hits, 1);
}

#[test]
fn test_model_without_tags() {
    let mut prefixer = Prefixer::new();
    assert_eq!(prefixer.columns::<Empty>("e", &[]).finalize(), "");
    assert_eq!(prefixer.columns::<Option<Address>>("a", &[]).finalize(), "a.id, a.city");
}

#[test]
fn test_bind_columns_round_trip() {
    let mut prefixer = Prefixer::new();
    let columns = prefixer.columns::<User>("u", &[join("Address", "a")]).finalize();

    let query = prefixer
        .columns::<User>("u", &[join("Address", "a")])
        .bind_columns("SELECT {columns} FROM users u JOIN addresses a ON a.user_id = u.id");

    assert_eq!(query, format!("SELECT {columns} FROM users u JOIN addresses a ON a.user_id = u.id"));
    assert!(!query.contains(COLUMNS_PLACEHOLDER));
    assert!(!columns.ends_with(", "));
}

#[test]
fn test_derived_type_info() {
    let info = <User as Reflect>::type_info();
    assert_eq!(info.name(), "User");
    assert_eq!(info.key().path(), "derive::app::User");

    let TypeKind::Record(fields) = info.kind() else {
        panic!("expected a record");
    };
    let idents: Vec<&str> = fields.iter().map(|f| f.ident()).collect();
    assert_eq!(idents, vec!["id", "name", "address", "password_hash", "session"]);
    assert_eq!(fields[3].tag(), Some("-"));
    assert_eq!(fields[4].tag(), None);
}

#[test]
fn test_cached_tree_shape() {
    let prefixer = Prefixer::new();
    let info = <User as Reflect>::type_info();
    let tree: Arc<SchemaNode> = prefixer.cache().get_or_build(info.key(), |excluded| {
        colprefix::introspect::Introspector::new(excluded).introspect_root(&info, "u")
    });

    assert_eq!(tree.leaf_count(), 4);
    let addr = tree.fields[2].child.as_ref().unwrap();
    assert_eq!((addr.table_alias.as_str(), addr.path_prefix.as_str()), ("addr", "addr"));
}
