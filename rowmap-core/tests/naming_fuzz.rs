use proptest::prelude::*;
use rowmap_core::{
    FieldDef, NamingConvention, Pojo, PojoSchema, PostgresDialect, QueryContext, SqlDialect, SqlMaker,
    StandardDialect, Value, to_underscore,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Reading {
    sensor_id: i64,
    taken_at: i64,
    celsius: f64,
    label: Option<String>,
}

impl Pojo for Reading {
    fn schema() -> PojoSchema<Self> {
        PojoSchema::new("Reading")
            .table("readings")
            .field(
                FieldDef::new(
                    "sensorId",
                    |r: &Reading| &r.sensor_id,
                    |r: &mut Reading| &mut r.sensor_id,
                )
                .id(),
            )
            .field(
                FieldDef::new(
                    "takenAt",
                    |r: &Reading| &r.taken_at,
                    |r: &mut Reading| &mut r.taken_at,
                )
                .id(),
            )
            .field(FieldDef::new(
                "celsius",
                |r: &Reading| &r.celsius,
                |r: &mut Reading| &mut r.celsius,
            ))
            .field(FieldDef::new(
                "label",
                |r: &Reading| &r.label,
                |r: &mut Reading| &mut r.label,
            ))
    }
}

proptest! {
    #[test]
    fn underscore_names_have_no_capitals(name in "[a-zA-Z][a-zA-Z0-9]{0,24}") {
        let converted = to_underscore(&name);
        prop_assert!(!converted.chars().any(char::is_uppercase));
        let capitals = name.chars().filter(|c| c.is_uppercase()).count();
        prop_assert_eq!(converted.matches('_').count(), capitals);
        prop_assert_eq!(to_underscore(&converted), converted.clone());
    }

    #[test]
    fn numbered_placeholders_are_sequential(n in 1usize..500) {
        let dialect = PostgresDialect::new(NamingConvention::LowerCase).with_numbered_placeholders(true);
        prop_assert_eq!(dialect.placeholder(n), format!("${n}"));
        prop_assert_eq!(StandardDialect.placeholder(n), "?");
    }

    #[test]
    fn composite_keys_follow_discovery_order(
        sensor_id in any::<i64>(),
        taken_at in any::<i64>(),
        celsius in -90.0f64..60.0,
    ) {
        let reading = Reading { sensor_id, taken_at, celsius, label: None };
        let maker = SqlMaker::postgres(NamingConvention::Underscore);
        let args = maker.update_args(&reading).unwrap();
        prop_assert_eq!(
            args,
            vec![Value::Double(celsius), Value::Null, Value::Long(sensor_id), Value::Long(taken_at)]
        );
        let delete = maker.delete_args(&reading).unwrap();
        prop_assert_eq!(delete, vec![Value::Long(sensor_id), Value::Long(taken_at)]);
    }

    #[test]
    fn fragments_are_appended_verbatim(
        clause in "[a-z_]{1,10} = \\?",
        limit in 1u64..10_000,
        offset in 0u64..10_000,
    ) {
        let maker = SqlMaker::standard();
        let ctx = QueryContext::new().where_clause(clause.clone()).limit(limit).offset(offset);
        let sql = maker.select_sql::<Reading>(&ctx).unwrap();
        prop_assert_eq!(
            sql,
            format!("select sensorId,takenAt,celsius,label from readings where {clause} limit {limit} offset {offset}")
        );
    }
}

#[test]
fn composite_key_statements() {
    let maker = SqlMaker::postgres(NamingConvention::Underscore);
    let ctx = QueryContext::new();
    assert_eq!(
        maker.update_sql::<Reading>(&ctx).unwrap(),
        "update readings set celsius=?,label=? where sensor_id=? and taken_at=?"
    );
    assert_eq!(
        maker.delete_sql::<Reading>(&ctx).unwrap(),
        "delete from readings where sensor_id=? and taken_at=?"
    );
    assert_eq!(
        maker.upsert_sql::<Reading>(&ctx).unwrap(),
        "insert into readings (sensor_id,taken_at,celsius,label) values (?,?,?,?) \
         on conflict (sensor_id, taken_at) do update set celsius = excluded.celsius, label = excluded.label"
    );
    assert_eq!(
        maker.create_table_sql::<Reading>().unwrap(),
        "create table readings (sensor_id bigint,taken_at bigint,celsius double precision,\
         label varchar(255), primary key (sensor_id,taken_at))"
    );
}
