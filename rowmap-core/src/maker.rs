use std::sync::Arc;

use tracing::trace;

use crate::cache::DescriptorCache;
use crate::config::MakerConfig;
use crate::dialect::{NamingConvention, PostgresDialect, SqlDialect, StandardDialect};
use crate::error::{RowmapError, RowmapResult};
use crate::model::Pojo;
use crate::pojo::{PojoInfo, SqlTemplate};
use crate::query::QueryContext;
use crate::value::Value;

/// Produces SQL text and argument lists for row types.
///
/// A maker pairs a dialect with a [`DescriptorCache`]. Makers are cheap to
/// clone and may share one cache; descriptors are keyed by dialect, so makers
/// with different dialects never see each other's column names.
///
/// ```
/// use rowmap_core::{Pojo, PojoSchema, FieldDef, QueryContext, SqlMaker};
///
/// struct Note {
///     id: i64,
///     body: String,
/// }
///
/// impl Pojo for Note {
///     fn schema() -> PojoSchema<Self> {
///         PojoSchema::new("Note")
///             .table("notes")
///             .field(FieldDef::new("id", |n: &Note| &n.id, |n: &mut Note| &mut n.id).id())
///             .field(FieldDef::new("body", |n: &Note| &n.body, |n: &mut Note| &mut n.body))
///     }
/// }
///
/// let maker = SqlMaker::standard();
/// let sql = maker.update_sql::<Note>(&QueryContext::new()).unwrap();
/// assert_eq!(sql, "update notes set body=? where id=?");
/// ```
#[derive(Clone, Debug)]
pub struct SqlMaker {
    dialect: Arc<dyn SqlDialect>,
    dialect_key: Arc<str>,
    cache: Arc<DescriptorCache>,
}

impl SqlMaker {
    /// A maker with its own cache.
    pub fn new(dialect: impl SqlDialect + 'static) -> Self {
        Self::with_cache(dialect, Arc::new(DescriptorCache::new()))
    }

    /// A maker sharing `cache` with other makers.
    pub fn with_cache(dialect: impl SqlDialect + 'static, cache: Arc<DescriptorCache>) -> Self {
        Self::from_parts(Arc::new(dialect), cache)
    }

    fn from_parts(dialect: Arc<dyn SqlDialect>, cache: Arc<DescriptorCache>) -> Self {
        Self {
            dialect_key: Arc::from(dialect.cache_key()),
            dialect,
            cache,
        }
    }

    pub fn standard() -> Self {
        Self::new(StandardDialect)
    }

    pub fn postgres(naming: NamingConvention) -> Self {
        Self::new(PostgresDialect::new(naming))
    }

    /// A maker configured by `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the settings are inconsistent.
    pub fn from_config(config: &MakerConfig) -> RowmapResult<Self> {
        Ok(Self::from_parts(config.build_dialect()?, Arc::new(DescriptorCache::new())))
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn cache(&self) -> &Arc<DescriptorCache> {
        &self.cache
    }

    /// Cached descriptor of `T`, built on first use.
    ///
    /// # Errors
    ///
    /// Propagates introspection errors.
    pub fn pojo_info<T: Pojo>(&self) -> RowmapResult<Arc<PojoInfo<T>>> {
        self.cache
            .get_or_try_build_keyed::<T>(self.dialect.as_ref(), &self.dialect_key)
    }

    fn render<T: Pojo>(
        &self,
        ctx: &QueryContext,
        pick: impl FnOnce(&PojoInfo<T>) -> RowmapResult<&SqlTemplate>,
    ) -> RowmapResult<String> {
        let info = self.pojo_info::<T>()?;
        let sql = pick(info.as_ref())?.render(ctx.table_or(info.table()));
        trace!(type_name = info.type_name(), %sql, "rendered statement");
        Ok(sql)
    }

    fn args<T: Pojo>(
        &self,
        row: &T,
        pick: impl FnOnce(&PojoInfo<T>) -> RowmapResult<&SqlTemplate>,
    ) -> RowmapResult<Vec<Value>> {
        let info = self.pojo_info::<T>()?;
        pick(info.as_ref())?
            .arg_columns()
            .iter()
            .map(|column| info.get_value(row, column))
            .collect()
    }

    /// `insert into <t> (<cols>) values (<placeholders>)` over non-generated columns.
    ///
    /// # Errors
    ///
    /// Fails for key-value rows and on introspection errors.
    pub fn insert_sql<T: Pojo>(&self, ctx: &QueryContext) -> RowmapResult<String> {
        self.render::<T>(ctx, PojoInfo::insert_template)
    }

    /// Values for [`insert_sql`](Self::insert_sql), in column order.
    ///
    /// # Errors
    ///
    /// Fails when a value cannot be read or transformed.
    pub fn insert_args<T: Pojo>(&self, row: &T) -> RowmapResult<Vec<Value>> {
        self.args(row, PojoInfo::insert_template)
    }

    /// `update <t> set <c>=?,... where <k>=? and ...`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without a primary key or settable column.
    pub fn update_sql<T: Pojo>(&self, ctx: &QueryContext) -> RowmapResult<String> {
        self.render::<T>(ctx, PojoInfo::update_template)
    }

    /// Set values followed by key values.
    ///
    /// # Errors
    ///
    /// Same as [`update_sql`](Self::update_sql), plus value read failures.
    pub fn update_args<T: Pojo>(&self, row: &T) -> RowmapResult<Vec<Value>> {
        self.args(row, PojoInfo::update_template)
    }

    /// `delete from <t> where <k>=? and ...`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without a primary key.
    pub fn delete_sql<T: Pojo>(&self, ctx: &QueryContext) -> RowmapResult<String> {
        self.render::<T>(ctx, PojoInfo::delete_template)
    }

    /// Key values in key order.
    ///
    /// # Errors
    ///
    /// Same as [`delete_sql`](Self::delete_sql), plus value read failures.
    pub fn delete_args<T: Pojo>(&self, row: &T) -> RowmapResult<Vec<Value>> {
        self.args(row, PojoInfo::delete_template)
    }

    /// Insert-or-update statement of the dialect.
    ///
    /// # Errors
    ///
    /// Unsupported by the standard dialect; a configuration error without a primary key.
    pub fn upsert_sql<T: Pojo>(&self, ctx: &QueryContext) -> RowmapResult<String> {
        self.render::<T>(ctx, PojoInfo::upsert_template)
    }

    /// Same values as [`insert_args`](Self::insert_args).
    ///
    /// # Errors
    ///
    /// Same as [`upsert_sql`](Self::upsert_sql), plus value read failures.
    pub fn upsert_args<T: Pojo>(&self, row: &T) -> RowmapResult<Vec<Value>> {
        self.args(row, PojoInfo::upsert_template)
    }

    /// `select <cols> from <t>` plus the context's fragments.
    ///
    /// # Errors
    ///
    /// Propagates introspection errors.
    pub fn select_sql<T: Pojo>(&self, ctx: &QueryContext) -> RowmapResult<String> {
        let info = self.pojo_info::<T>()?;
        let mut sql = format!(
            "select {} from {}",
            info.select_columns(),
            ctx.table_or(info.table())
        );
        ctx.push_filters(&mut sql);
        ctx.push_tail(&mut sql);
        trace!(type_name = info.type_name(), %sql, "rendered select");
        Ok(sql)
    }

    /// `select count(*) from <t>` plus the context's `where` fragment.
    ///
    /// # Errors
    ///
    /// Propagates introspection errors.
    pub fn select_count_sql<T: Pojo>(&self, ctx: &QueryContext) -> RowmapResult<String> {
        let info = self.pojo_info::<T>()?;
        let mut sql = format!("select count(*) from {}", ctx.table_or(info.table()));
        ctx.push_filters(&mut sql);
        Ok(sql)
    }

    /// DDL for the table of `T`.
    ///
    /// # Errors
    ///
    /// Unsupported for key-value rows.
    pub fn create_table_sql<T: Pojo>(&self) -> RowmapResult<String> {
        let info = self.pojo_info::<T>()?;
        if info.is_key_value() {
            return Err(RowmapError::unsupported(format!(
                "create table for key-value row {} has no columns",
                info.type_name()
            )));
        }
        let dialect = self.dialect.as_ref();
        let mut definitions: Vec<String> = Vec::with_capacity(info.properties().len());
        for property in info.properties() {
            let name = property.column_name();
            let column = property.column().cloned().unwrap_or_default();
            if let Some(definition) = column.definition.as_deref().filter(|d| !d.trim().is_empty()) {
                definitions.push(format!("{name} {definition}"));
                continue;
            }
            let column_type = dialect.column_type(property.data_type(), property.enum_type(), &column);
            let mut definition = if property.is_generated() {
                dialect.generated_column(name, &column_type)
            } else {
                format!("{name} {column_type}")
            };
            if column.unique {
                definition.push_str(" unique");
            }
            if !column.nullable {
                definition.push_str(" not null");
            }
            definitions.push(definition);
        }
        let mut sql = format!("create table {} ({}", info.table(), definitions.join(","));
        if !info.primary_keys().is_empty() {
            sql.push_str(", primary key (");
            sql.push_str(&info.primary_keys().join(","));
            sql.push(')');
        }
        sql.push(')');
        Ok(sql)
    }

    /// Coerces a driver value for a column of type `db_type`.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the dialect cannot coerce the value.
    pub fn convert_value(&self, value: Value, db_type: &str) -> RowmapResult<Value> {
        self.dialect.convert_value(value, db_type)
    }

    /// Writes result columns into `row`: `convert_value`, then `put_value`.
    ///
    /// With `ignore_missing`, columns without a property are skipped.
    ///
    /// # Errors
    ///
    /// Returns a mapping error on the first column that cannot be written.
    pub fn populate<T, I>(&self, row: &mut T, columns: I, ignore_missing: bool) -> RowmapResult<()>
    where
        T: Pojo,
        I: IntoIterator<Item = (String, String, Value)>,
    {
        let info = self.pojo_info::<T>()?;
        for (column, db_type, raw) in columns {
            let value = self.convert_value(raw, &db_type)?;
            if ignore_missing {
                info.put_value_or_ignore(row, &column, value)?;
            } else {
                info.put_value(row, &column, value)?;
            }
        }
        Ok(())
    }
}

impl Default for SqlMaker {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessorDef, Column, FieldDef, PojoSchema};
    use std::collections::HashMap;

    #[derive(Debug, Default, PartialEq)]
    struct Order {
        id: i64,
        tenant: String,
        amount: f64,
        note: Option<String>,
    }

    impl Pojo for Order {
        fn schema() -> PojoSchema<Self> {
            PojoSchema::new("Order")
                .table("orders")
                .field(FieldDef::new("id", |o: &Order| &o.id, |o: &mut Order| &mut o.id).id().generated())
                .field(FieldDef::new("tenant", |o: &Order| &o.tenant, |o: &mut Order| &mut o.tenant).id())
                .field(FieldDef::new("amount", |o: &Order| &o.amount, |o: &mut Order| &mut o.amount))
                .field(FieldDef::new("note", |o: &Order| &o.note, |o: &mut Order| &mut o.note))
        }
    }

    fn order() -> Order {
        Order {
            id: 7,
            tenant: "acme".into(),
            amount: 12.5,
            note: None,
        }
    }

    #[test]
    fn insert_skips_generated_columns() {
        let maker = SqlMaker::standard();
        let ctx = QueryContext::new();
        assert_eq!(
            maker.insert_sql::<Order>(&ctx).unwrap(),
            "insert into orders (tenant,amount,note) values (?,?,?)"
        );
        assert_eq!(
            maker.insert_args(&order()).unwrap(),
            vec![Value::from("acme"), Value::Double(12.5), Value::Null]
        );
    }

    #[test]
    fn update_args_put_keys_last() {
        let maker = SqlMaker::standard();
        assert_eq!(
            maker.update_sql::<Order>(&QueryContext::new()).unwrap(),
            "update orders set amount=?,note=? where id=? and tenant=?"
        );
        assert_eq!(
            maker.update_args(&order()).unwrap(),
            vec![Value::Double(12.5), Value::Null, Value::Long(7), Value::from("acme")]
        );
    }

    #[test]
    fn delete_and_table_override() {
        let maker = SqlMaker::standard();
        let ctx = QueryContext::new().table("orders_2024");
        assert_eq!(
            maker.delete_sql::<Order>(&ctx).unwrap(),
            "delete from orders_2024 where id=? and tenant=?"
        );
        assert_eq!(
            maker.delete_args(&order()).unwrap(),
            vec![Value::Long(7), Value::from("acme")]
        );
    }

    #[test]
    fn standard_upsert_is_unsupported() {
        let err = SqlMaker::standard()
            .upsert_sql::<Order>(&QueryContext::new())
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn numbered_placeholders_continue_across_clauses() {
        let maker = SqlMaker::new(
            PostgresDialect::new(NamingConvention::LowerCase).with_numbered_placeholders(true),
        );
        assert_eq!(
            maker.update_sql::<Order>(&QueryContext::new()).unwrap(),
            "update orders set amount=$1,note=$2 where id=$3 and tenant=$4"
        );
        assert_eq!(
            maker.upsert_sql::<Order>(&QueryContext::new()).unwrap(),
            "insert into orders (tenant,amount,note) values ($1,$2,$3) \
             on conflict (id, tenant) do update set amount = excluded.amount, note = excluded.note"
        );
    }

    #[test]
    fn select_and_count() {
        let maker = SqlMaker::standard();
        let ctx = QueryContext::new()
            .where_clause("tenant=?")
            .order_by("id")
            .limit(5)
            .param("acme");
        assert_eq!(
            maker.select_sql::<Order>(&ctx).unwrap(),
            "select id,tenant,amount,note from orders where tenant=? order by id limit 5"
        );
        assert_eq!(
            maker.select_count_sql::<Order>(&ctx).unwrap(),
            "select count(*) from orders where tenant=?"
        );
    }

    struct Product {
        sku: String,
        price: f64,
        stock: i32,
    }

    impl Pojo for Product {
        fn schema() -> PojoSchema<Self> {
            let sku = Column {
                name: Some("sku".into()),
                length: 32,
                unique: true,
                nullable: false,
                ..Column::default()
            };
            let price = Column {
                definition: Some("numeric(12,2) default 0".into()),
                ..Column::default()
            };
            PojoSchema::new("Product")
                .field(
                    FieldDef::new("sku", |p: &Product| &p.sku, |p: &mut Product| &mut p.sku)
                        .id()
                        .annotated(crate::model::Annotations {
                            column: Some(sku),
                            id: true,
                            ..Default::default()
                        }),
                )
                .field(
                    FieldDef::new("price", |p: &Product| &p.price, |p: &mut Product| &mut p.price)
                        .annotated(crate::model::Annotations {
                            column: Some(price),
                            ..Default::default()
                        }),
                )
                .accessor(AccessorDef::new(
                    "stock",
                    |p: &Product| p.stock,
                    |p: &mut Product, v: i32| p.stock = v,
                ))
        }
    }

    #[test]
    fn create_table_uses_column_metadata() {
        assert_eq!(
            SqlMaker::standard().create_table_sql::<Product>().unwrap(),
            "create table Product (sku varchar(32) unique not null,price numeric(12,2) default 0,\
             stock integer, primary key (sku))"
        );
        assert_eq!(
            SqlMaker::postgres(NamingConvention::LowerCase)
                .create_table_sql::<Order>()
                .unwrap(),
            "create table orders (id serial,tenant varchar(255),amount double precision,\
             note varchar(255), primary key (id,tenant))"
        );
        assert_eq!(
            SqlMaker::standard().create_table_sql::<Order>().unwrap(),
            "create table orders (id bigint auto_increment,tenant varchar(255),amount double,\
             note varchar(255), primary key (id,tenant))"
        );
    }

    #[test]
    fn populate_converts_then_writes() {
        let maker = SqlMaker::postgres(NamingConvention::LowerCase);
        let mut row = Order::default();
        maker
            .populate(
                &mut row,
                vec![
                    ("id".to_owned(), "int8".to_owned(), Value::Int(9)),
                    ("tenant".to_owned(), "text".to_owned(), Value::from("acme")),
                    ("amount".to_owned(), "float8".to_owned(), Value::Float(2.5)),
                    ("extra".to_owned(), "text".to_owned(), Value::from("ignored")),
                ],
                true,
            )
            .unwrap();
        assert_eq!(row.id, 9);
        assert_eq!(row.amount, 2.5);

        let err = maker
            .populate(
                &mut row,
                vec![("extra".to_owned(), "text".to_owned(), Value::Null)],
                false,
            )
            .unwrap_err();
        assert!(err.is_mapping());
    }

    #[test]
    fn key_value_rows_select_star_and_reject_writes() {
        let maker = SqlMaker::standard();
        let ctx = QueryContext::new().table("anything");
        assert_eq!(
            maker.select_sql::<HashMap<String, Value>>(&ctx).unwrap(),
            "select * from anything"
        );
        assert!(
            maker
                .insert_sql::<HashMap<String, Value>>(&ctx)
                .unwrap_err()
                .is_unsupported()
        );
    }

    #[test]
    fn update_without_key_is_a_configuration_error() {
        struct Log {
            line: String,
        }
        impl Pojo for Log {
            fn schema() -> PojoSchema<Self> {
                PojoSchema::new("Log").field(FieldDef::new("line", |l: &Log| &l.line, |l: &mut Log| &mut l.line))
            }
        }
        let maker = SqlMaker::postgres(NamingConvention::LowerCase);
        let ctx = QueryContext::new();
        assert!(maker.update_sql::<Log>(&ctx).unwrap_err().is_configuration());
        assert!(maker.delete_sql::<Log>(&ctx).unwrap_err().is_configuration());
        assert!(maker.upsert_sql::<Log>(&ctx).unwrap_err().is_configuration());
        assert!(
            maker
                .update_args(&Log { line: "x".into() })
                .unwrap_err()
                .is_configuration()
        );
    }
}
