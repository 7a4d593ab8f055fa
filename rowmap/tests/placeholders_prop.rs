use proptest::prelude::*;
use rowmap::prelude::*;
use rowmap::{NamingConvention, PostgresDialect};

#[derive(Pojo, Debug, Default, Clone)]
#[rowmap(table = "line_items")]
struct LineItem {
    #[rowmap(id)]
    order_id: i64,
    #[rowmap(id)]
    line_no: i32,
    sku: String,
    quantity: i32,
    #[rowmap(decimal)]
    price: f64,
    note: Option<String>,
}

fn line_item() -> impl Strategy<Value = LineItem> {
    (
        any::<i64>(),
        any::<i32>(),
        "[a-z0-9-]{0,12}",
        any::<i32>(),
        -1.0e6f64..1.0e6,
        proptest::option::of("[ -~]{0,20}"),
    )
        .prop_map(|(order_id, line_no, sku, quantity, price, note)| LineItem {
            order_id,
            line_no,
            sku,
            quantity,
            price,
            note,
        })
}

fn makers() -> Vec<SqlMaker> {
    vec![
        SqlMaker::standard(),
        SqlMaker::postgres(NamingConvention::Underscore),
        SqlMaker::new(PostgresDialect::new(NamingConvention::LowerCase).with_numbered_placeholders(true)),
    ]
}

fn placeholder_count(sql: &str) -> usize {
    sql.matches('?').count() + sql.matches('$').count()
}

proptest! {
    #[test]
    fn every_placeholder_has_an_argument(item in line_item()) {
        for maker in makers() {
            let ctx = QueryContext::new();
            let insert = maker.insert_sql::<LineItem>(&ctx).unwrap();
            prop_assert_eq!(placeholder_count(&insert), maker.insert_args(&item).unwrap().len());
            let update = maker.update_sql::<LineItem>(&ctx).unwrap();
            prop_assert_eq!(placeholder_count(&update), maker.update_args(&item).unwrap().len());
            let delete = maker.delete_sql::<LineItem>(&ctx).unwrap();
            prop_assert_eq!(placeholder_count(&delete), maker.delete_args(&item).unwrap().len());
        }
    }

    #[test]
    fn update_args_end_with_the_keys(item in line_item()) {
        let maker = SqlMaker::standard();
        let args = maker.update_args(&item).unwrap();
        prop_assert_eq!(args.len(), 6);
        prop_assert_eq!(&args[4], &Value::Long(item.order_id));
        prop_assert_eq!(&args[5], &Value::Int(item.line_no));
    }

    #[test]
    fn values_written_back_are_read_unchanged(item in line_item()) {
        let maker = SqlMaker::standard();
        let info = maker.pojo_info::<LineItem>().unwrap();
        let mut copy = LineItem::default();
        for property in info.properties() {
            let value = info.get_value(&item, property.column_name()).unwrap();
            info.put_value(&mut copy, property.column_name(), value).unwrap();
        }
        prop_assert_eq!(copy.order_id, item.order_id);
        prop_assert_eq!(copy.line_no, item.line_no);
        prop_assert_eq!(&copy.sku, &item.sku);
        prop_assert_eq!(copy.quantity, item.quantity);
        prop_assert_eq!(copy.price, item.price);
        prop_assert_eq!(&copy.note, &item.note);
    }

    #[test]
    fn table_override_replaces_the_table_only(table in "[a-z][a-z0-9_]{0,15}") {
        let maker = SqlMaker::standard();
        let ctx = QueryContext::new().table(table.clone());
        let insert = maker.insert_sql::<LineItem>(&ctx).unwrap();
        let prefix = format!("insert into {table} (");
        prop_assert!(insert.starts_with(&prefix));
        let select = maker.select_sql::<LineItem>(&ctx).unwrap();
        let suffix = format!(" from {table}");
        prop_assert!(select.ends_with(&suffix));
    }
}

#[test]
fn numbered_placeholders_count_upwards() {
    let maker = SqlMaker::new(PostgresDialect::new(NamingConvention::Underscore).with_numbered_placeholders(true));
    assert_eq!(
        maker.update_sql::<LineItem>(&QueryContext::new()).unwrap(),
        "update line_items set sku=$1,quantity=$2,price=$3,note=$4 where order_id=$5 and line_no=$6"
    );
}
