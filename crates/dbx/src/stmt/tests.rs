use super::*;
use crate::dialect::Dialect;
use crate::error::DbxError;
use crate::row::{Record, Row};
use crate::set::Set;
use crate::test_support::MockSession;
use std::ops::ControlFlow;

fn user_row(id: i64, name: &str) -> Row {
    Row::from_pairs([("id", Value::Int(id)), ("name", Value::Text(name.into()))])
}

#[test]
fn select_with_conditions_order_and_limit() {
    let c = table("users")
        .eq("status", "active")
        .op("age", ">", 18)
        .desc(&["created_at"])
        .asc(&["id"])
        .limit_offset(10, 20)
        .compile_select(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(
        c.sql,
        "SELECT * FROM `users` WHERE `status`=? AND `age` > ? ORDER BY `created_at` DESC, `id` ASC LIMIT 10 OFFSET 20"
    );
    assert_eq!(c.values, vec![Value::Text("active".into()), Value::Int(18)]);
}

#[test]
fn non_positive_limit_means_unbounded() {
    for (count, offset) in [(0, 0), (0, 50), (-1, 10)] {
        let c = table("t")
            .limit_offset(count, offset)
            .compile_select(&Dialect::MYSQL)
            .unwrap();
        assert_eq!(c.sql, "SELECT * FROM `t`");
    }
}

#[test]
fn top_level_or_is_parenthesized_between_conditions() {
    let c = table("users")
        .eq("x", 1)
        .or([Cond::eq("name", "a"), Cond::eq("age", 10)])
        .compile_select(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(
        c.sql,
        "SELECT * FROM `users` WHERE `x`=? AND (`name`=? OR `age`=?)"
    );
}

#[test]
fn join_chain_projects_every_table() {
    let c = table("users u")
        .inner_join("orders o", "o.user_id = u.id")
        .left_join("payments", "payments.order_id = o.id")
        .eq("u.status", "active")
        .compile_select(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(
        c.sql,
        "SELECT u.*, o.*, payments.* FROM users u INNER JOIN orders o ON o.user_id = u.id \
         LEFT JOIN `payments` ON payments.order_id = o.id WHERE u.status=?"
    );

    let c = table("users u")
        .inner_join("orders o", "o.user_id = u.id")
        .cols(&["u.id", "o.total"])
        .compile_select(&Dialect::MYSQL)
        .unwrap();
    assert!(c.sql.starts_with("SELECT u.id, o.total FROM"));
}

#[test]
fn projection_and_grouping() {
    let c = table("orders")
        .select("user_id, COUNT(*) AS n")
        .group_by(&["user_id"])
        .compile_select(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(
        c.sql,
        "SELECT user_id, COUNT(*) AS n FROM `orders` GROUP BY `user_id`"
    );
}

#[test]
fn raw_sql_ignores_table_state() {
    let c = raw_sql("SELECT * FROM users WHERE id = ? OR name = ?", (1, "a"))
        .compile_select(&Dialect::POSTGRES)
        .unwrap();
    assert_eq!(c.sql, "SELECT * FROM users WHERE id = $1 OR name = $2");
    assert_eq!(c.values.len(), 2);
}

#[test]
fn empty_table_is_a_config_error() {
    let err = table("").eq("id", 1).compile_select(&Dialect::MYSQL).unwrap_err();
    assert!(err.is_config());
    assert!(Stmt::default().compile_delete(&Dialect::MYSQL).unwrap_err().is_config());
}

#[test]
fn update_set_binds_set_values_before_where_values() {
    let c = table("goods")
        .eq("id", 7)
        .in_list("state", (1, 2))
        .set("name", "pen")
        .set_expr("stock", "stock - 1")
        .set("price", 3)
        .compile_update_set(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(
        c.sql,
        "UPDATE `goods` SET `name`=?,`stock`=stock - 1,`price`=? WHERE `id`=? AND `state` IN (?,?)"
    );
    assert_eq!(
        c.values,
        vec![
            Value::Text("pen".into()),
            Value::Int(3),
            Value::Int(7),
            Value::Int(1),
            Value::Int(2)
        ]
    );
    assert_eq!(Dialect::count_placeholders(&c.sql), c.values.len());
}

#[test]
fn update_set_without_sets_or_table_is_skipped() {
    assert!(table("goods").eq("id", 1).compile_update_set(&Dialect::MYSQL).is_none());
    assert!(
        table("goods")
            .sets([Set::value("", 1)])
            .compile_update_set(&Dialect::MYSQL)
            .is_none()
    );
    assert!(table("").set("a", 1).compile_update_set(&Dialect::MYSQL).is_none());
}

#[test]
fn postgres_numbering_spans_set_and_where() {
    let c = table("goods")
        .set("name", "pen")
        .eq("id", 7)
        .compile_update_set(&Dialect::POSTGRES)
        .unwrap();
    assert_eq!(c.sql, "UPDATE \"goods\" SET \"name\"=$1 WHERE \"id\"=$2");
}

#[test]
fn insert_ignores_conditions() {
    let record = Record::new().set("name", "a").set("age", 3);
    let c = table("users")
        .eq("id", 1)
        .compile_insert(&Dialect::MYSQL, &record)
        .unwrap();
    assert_eq!(c.sql, "INSERT INTO `users` (`name`,`age`) VALUES (?,?)");
    assert_eq!(c.values, vec![Value::Text("a".into()), Value::Int(3)]);
}

#[test]
fn update_respects_column_allow_list() {
    let record = Record::new().set("name", "a").set("age", 3).set("email", "x");
    let c = table("users")
        .cols(&["age", "email"])
        .eq("id", 9)
        .compile_update(&Dialect::MYSQL, &record)
        .unwrap()
        .unwrap();
    assert_eq!(c.sql, "UPDATE `users` SET `age`=?,`email`=? WHERE `id`=?");
    assert_eq!(c.values, vec![Value::Int(3), Value::Text("x".into()), Value::Int(9)]);

    let none = table("users")
        .cols(&["missing"])
        .compile_update(&Dialect::MYSQL, &record)
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn raw_where_with_or_stays_grouped() {
    let c = table("users")
        .where_raw("role = 'admin' OR role = 'owner'")
        .eq("tenant_id", 7)
        .compile_delete(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(
        c.sql,
        "DELETE FROM `users` WHERE (role = 'admin' OR role = 'owner') AND `tenant_id`=?"
    );
    assert_eq!(c.values, vec![Value::Int(7)]);

    let c = table("goods")
        .where_raw("a = 1 OR b = 2")
        .eq("shop", 3)
        .set("stock", 0)
        .compile_update_set(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(
        c.sql,
        "UPDATE `goods` SET `stock`=? WHERE (a = 1 OR b = 2) AND `shop`=?"
    );

    let c = table("goods")
        .not([Cond::raw("a = 1 OR b = 2"), Cond::eq("c", 3)])
        .compile_delete(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(c.sql, "DELETE FROM `goods` WHERE NOT ((a = 1 OR b = 2) AND `c`=?)");

    let c = table("users")
        .where_raw("role = 'admin' OR role = 'owner'")
        .compile_select(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(c.sql, "SELECT * FROM `users` WHERE role = 'admin' OR role = 'owner'");
}

#[test]
fn delete_requires_conditions() {
    let c = table("users").eq("id", 1).compile_delete(&Dialect::MYSQL).unwrap();
    assert_eq!(c.sql, "DELETE FROM `users` WHERE `id`=?");

    let err = table("users")
        .in_list("id", ())
        .compile_delete(&Dialect::MYSQL)
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn count_and_sum_reuse_conditions() {
    let s = table("orders").eq("user_id", 3).desc(&["id"]).limit(5);
    let c = s.compile_count(&Dialect::MYSQL).unwrap();
    assert_eq!(c.sql, "SELECT COUNT(*) FROM `orders` WHERE `user_id`=?");

    let c = s.compile_sum(&Dialect::MYSQL, "total").unwrap();
    assert_eq!(
        c.sql,
        "SELECT COALESCE(SUM(`total`),0) FROM `orders` WHERE `user_id`=?"
    );

    let c = s.compile_sum(&Dialect::POSTGRES, "total").unwrap();
    assert_eq!(
        c.sql,
        "SELECT CAST(COALESCE(SUM(\"total\"),0) AS DOUBLE PRECISION) FROM \"orders\" WHERE \"user_id\"=$1"
    );

    let c = table("orders")
        .group_by(&["user_id"])
        .compile_count(&Dialect::MYSQL)
        .unwrap();
    assert_eq!(
        c.sql,
        "SELECT COUNT(*) FROM (SELECT 1 FROM `orders` GROUP BY `user_id`) AS dbx_count"
    );
}

#[tokio::test]
async fn get_is_repeatable_and_limited_to_one_row() {
    let db = MockSession::new();
    db.push_rows(vec![user_row(1, "a")]);
    db.push_rows(vec![user_row(1, "a")]);

    let stmt = table("users").eq("id", 1);
    let first: Option<Row> = stmt.get(&db).await.unwrap();
    let second: Option<Row> = stmt.get(&db).await.unwrap();
    assert_eq!(first, second);
    assert!(first.is_some());

    let sqls = db.sqls();
    assert_eq!(sqls.len(), 2);
    assert_eq!(sqls[0], sqls[1]);
    assert_eq!(sqls[0], "SELECT * FROM `users` WHERE `id`=? LIMIT 1");
}

#[tokio::test]
async fn get_returns_none_when_nothing_matches() {
    let db = MockSession::new();
    let found: Option<Row> = table("users").eq("id", 404).get(&db).await.unwrap();
    assert!(found.is_none());

    let err = table("users").eq("id", 404).get_one::<Row>(&db).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn get_by_column() {
    let db = MockSession::new().with_dialect(Dialect::POSTGRES);
    db.push_rows(vec![user_row(5, "e")]);
    let row: Option<Row> = get_by(&db, "users", "id", 5).await.unwrap();
    assert_eq!(row.unwrap().get::<String>("name").unwrap(), "e");
    assert_eq!(
        db.sqls()[0],
        "SELECT * FROM \"users\" WHERE \"id\"=$1 LIMIT 1"
    );
}

#[tokio::test]
async fn list_maps_every_row() {
    let db = MockSession::new();
    db.push_rows(vec![user_row(1, "a"), user_row(2, "b")]);
    let rows: Vec<Row> = table("users").asc(&["id"]).list(&db).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get::<i64>("id").unwrap(), 2);
}

#[tokio::test]
async fn driver_errors_surface_verbatim() {
    let db = MockSession::new();
    db.fail_on("DELETE");
    let err = table("users").eq("id", 1).delete(&db).await.unwrap_err();
    assert!(matches!(err, DbxError::Driver(_)));
}

#[tokio::test]
async fn update_set_noop_does_not_touch_the_session() {
    let db = MockSession::new();
    assert_eq!(table("users").eq("id", 1).update_set(&db).await.unwrap(), 0);
    assert!(db.calls().is_empty());
}

#[tokio::test]
async fn insert_and_update_report_affected_rows() {
    let db = MockSession::new();
    db.push_affected(1).push_affected(4);
    let record = Record::new().set("name", "a");
    assert_eq!(table("users").insert(&db, &record).await.unwrap(), 1);
    assert_eq!(
        table("users").eq("team", 2).update(&db, &record).await.unwrap(),
        4
    );
}

#[tokio::test]
async fn count_and_sum_read_the_first_column() {
    let db = MockSession::new();
    db.push_rows(vec![Row::from_pairs([("count", Value::Int(42))])]);
    db.push_rows(vec![Row::from_pairs([("sum", Value::Float(12.5))])]);
    let s = table("orders").eq("user_id", 1);
    assert_eq!(s.count(&db).await.unwrap(), 42);
    assert_eq!(s.sum(&db, "total").await.unwrap(), 12.5);
}

#[tokio::test]
async fn iterate_stops_on_break() {
    let db = MockSession::new();
    db.push_rows((1..=5).map(|i| user_row(i, "x")).collect());

    let mut seen = Vec::new();
    table("users")
        .iterate(&db, |idx, row: Row| {
            seen.push((idx, row.get::<i64>("id").unwrap()));
            if idx == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await
        .unwrap();
    assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3)]);
}

#[tokio::test]
async fn iter_is_single_pass_and_closable() {
    let db = MockSession::new();
    db.push_rows((1..=3).map(|i| user_row(i, "x")).collect());

    let mut rows = table("users").iter::<Row>(&db).await.unwrap();
    let first = rows.next().await.unwrap().unwrap();
    assert_eq!(first.get::<i64>("id").unwrap(), 1);
    rows.close();
    assert!(rows.is_closed());
    assert!(rows.next().await.is_none());
}

#[tokio::test]
async fn iter_ends_after_last_row() {
    let db = MockSession::new();
    db.push_rows(vec![user_row(1, "a")]);
    let mut rows = table("users").iter::<Row>(&db).await.unwrap();
    assert!(rows.next().await.is_some());
    assert!(rows.next().await.is_none());
    assert!(rows.is_closed());
}
