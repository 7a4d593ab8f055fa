use rowmap::prelude::*;
use rowmap::{NamingConvention, PostgresDialect};

#[derive(Pojo, Debug, Default, PartialEq)]
#[rowmap(table = "testTable")]
struct Test {
    #[rowmap(id, column = "id")]
    id: i32,
    #[rowmap(column = "name")]
    name: String,
}

#[derive(Pojo, Debug, Default)]
#[rowmap(table = "user_account")]
#[rowmap(accessor(name = "fullName", get = UserAccount::full_name, set = UserAccount::set_full_name))]
struct UserAccount {
    #[rowmap(id)]
    user_id: i64,
    #[rowmap(transient)]
    first: String,
    #[rowmap(transient)]
    last: String,
    #[rowmap(column(length = 64, nullable = false))]
    email: String,
}

impl UserAccount {
    fn full_name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }

    fn set_full_name(&mut self, value: String) {
        let mut parts = value.splitn(2, ' ');
        self.first = parts.next().unwrap_or_default().to_owned();
        self.last = parts.next().unwrap_or_default().to_owned();
    }
}

#[derive(Pojo, Debug, Default)]
#[rowmap(table = "orders", column_order("total", "id"))]
struct Order {
    #[rowmap(id, generated)]
    id: i64,
    #[rowmap(decimal, column(precision = 12, scale = 2))]
    total: f64,
    #[allow(dead_code)]
    #[rowmap(immutable)]
    checksum: u64,
}

#[derive(Pojo, Debug, Default)]
#[rowmap(table = "audit_log")]
struct AuditLog {
    message: String,
    level: i32,
}

#[test]
fn insert_uses_explicit_columns_in_declaration_order() {
    let maker = SqlMaker::standard();
    let sql = maker.insert_sql::<Test>(&QueryContext::new()).unwrap();
    assert_eq!(sql, "insert into testTable (id,name) values (?,?)");

    let args = maker
        .insert_args(&Test {
            id: 1,
            name: "a".into(),
        })
        .unwrap();
    assert_eq!(args, vec![Value::Int(1), Value::Text("a".into())]);
}

#[test]
fn update_sets_non_key_columns_then_matches_keys() {
    let maker = SqlMaker::standard();
    let row = Test {
        id: 7,
        name: "seven".into(),
    };
    assert_eq!(
        maker.update_sql::<Test>(&QueryContext::new()).unwrap(),
        "update testTable set name=? where id=?"
    );
    assert_eq!(
        maker.update_args(&row).unwrap(),
        vec![Value::Text("seven".into()), Value::Int(7)]
    );
    assert_eq!(
        maker.delete_sql::<Test>(&QueryContext::new()).unwrap(),
        "delete from testTable where id=?"
    );
    assert_eq!(maker.delete_args(&row).unwrap(), vec![Value::Int(7)]);
}

#[test]
fn table_override_and_select_fragments() {
    let maker = SqlMaker::standard();
    let ctx = QueryContext::new()
        .table("testTable_2")
        .where_clause("name = ?")
        .order_by("id desc")
        .limit(5)
        .offset(10)
        .param("bob");
    assert_eq!(
        maker.select_sql::<Test>(&ctx).unwrap(),
        "select id,name from testTable_2 where name = ? order by id desc limit 5 offset 10"
    );
    assert_eq!(
        maker.select_count_sql::<Test>(&ctx).unwrap(),
        "select count(*) from testTable_2 where name = ?"
    );
    assert_eq!(
        maker.insert_sql::<Test>(&ctx).unwrap(),
        "insert into testTable_2 (id,name) values (?,?)"
    );
}

#[test]
fn accessors_become_properties_after_fields() {
    let maker = SqlMaker::standard();
    let sql = maker.insert_sql::<UserAccount>(&QueryContext::new()).unwrap();
    assert_eq!(
        sql,
        "insert into user_account (user_id,email,fullName) values (?,?,?)"
    );

    let account = UserAccount {
        user_id: 3,
        first: "Ada".into(),
        last: "Lovelace".into(),
        email: "ada@example.com".into(),
    };
    let args = maker.insert_args(&account).unwrap();
    assert_eq!(args[2], Value::Text("Ada Lovelace".into()));

    let mut loaded = UserAccount::default();
    maker
        .populate(
            &mut loaded,
            vec![(
                "fullName".to_owned(),
                "varchar".to_owned(),
                Value::Text("Grace Hopper".into()),
            )],
            false,
        )
        .unwrap();
    assert_eq!(loaded.first, "Grace");
    assert_eq!(loaded.last, "Hopper");
}

#[test]
fn postgres_underscore_naming_renames_in_place() {
    let maker = SqlMaker::postgres(NamingConvention::Underscore);
    let info = maker.pojo_info::<UserAccount>().unwrap();
    let columns: Vec<String> = info.properties().column_names();
    assert_eq!(columns, ["user_id", "email", "full_name"]);
    assert_eq!(info.primary_keys(), ["user_id"]);
    assert_eq!(
        maker.update_sql::<UserAccount>(&QueryContext::new()).unwrap(),
        "update user_account set email=?,full_name=? where user_id=?"
    );
    assert!(info.property("fullName").is_some());
}

#[test]
fn postgres_numbered_placeholders() {
    let maker = SqlMaker::new(
        PostgresDialect::new(NamingConvention::LowerCase).with_numbered_placeholders(true),
    );
    assert_eq!(
        maker.update_sql::<Test>(&QueryContext::new()).unwrap(),
        "update testTable set name=$1 where id=$2"
    );
    assert_eq!(
        maker.insert_sql::<Test>(&QueryContext::new()).unwrap(),
        "insert into testTable (id,name) values ($1,$2)"
    );
}

#[test]
fn postgres_upsert_updates_non_key_columns() {
    let maker = SqlMaker::postgres(NamingConvention::LowerCase);
    assert_eq!(
        maker.upsert_sql::<Test>(&QueryContext::new()).unwrap(),
        "insert into testTable (id,name) values (?,?) on conflict (id) do update set name = excluded.name"
    );
    let args = maker
        .upsert_args(&Test {
            id: 2,
            name: "b".into(),
        })
        .unwrap();
    assert_eq!(args, vec![Value::Int(2), Value::Text("b".into())]);
}

#[test]
fn keyless_rows_cannot_update_or_upsert() {
    let postgres = SqlMaker::postgres(NamingConvention::LowerCase);
    let err = postgres.upsert_sql::<AuditLog>(&QueryContext::new()).unwrap_err();
    assert!(err.is_configuration(), "{err}");
    assert!(postgres
        .update_sql::<AuditLog>(&QueryContext::new())
        .unwrap_err()
        .is_configuration());
    assert!(postgres
        .delete_sql::<AuditLog>(&QueryContext::new())
        .unwrap_err()
        .is_configuration());

    // inserts never need a key
    assert_eq!(
        postgres.insert_sql::<AuditLog>(&QueryContext::new()).unwrap(),
        "insert into audit_log (message,level) values (?,?)"
    );

    let standard = SqlMaker::standard();
    assert!(standard
        .upsert_sql::<Test>(&QueryContext::new())
        .unwrap_err()
        .is_unsupported());
}

#[test]
fn generated_keys_are_left_out_of_writes() {
    let maker = SqlMaker::standard();
    let info = maker.pojo_info::<Order>().unwrap();
    assert_eq!(info.generated_columns(), ["id"]);
    assert_eq!(info.select_columns(), "total,id");
    assert_eq!(
        maker.insert_sql::<Order>(&QueryContext::new()).unwrap(),
        "insert into orders (total) values (?)"
    );
    assert!(info.property("checksum").is_none());
}

#[test]
fn create_table_follows_column_metadata() {
    let maker = SqlMaker::standard();
    assert_eq!(
        maker.create_table_sql::<Order>().unwrap(),
        "create table orders (total decimal(12,2),id bigint auto_increment, primary key (id))"
    );
    assert_eq!(
        maker.create_table_sql::<UserAccount>().unwrap(),
        "create table user_account (user_id bigint,email varchar(64) not null,fullName varchar(255), primary key (user_id))"
    );

    let postgres = SqlMaker::postgres(NamingConvention::Underscore);
    assert_eq!(
        postgres.create_table_sql::<Order>().unwrap(),
        "create table orders (total decimal(12,2),id serial, primary key (id))"
    );
}
