pub use sea_orm_migration::prelude::*;

mod m20250110_000001_create_staff_table;
mod m20250110_000002_create_stores_table;
mod m20250110_000003_create_products_table;
mod m20250110_000004_create_product_store_mappings_table;
mod m20250110_000005_create_orders_table;
mod m20250110_000006_create_order_items_table;
mod m20250110_000007_create_purchase_lists_table;
mod m20250110_000008_create_purchase_list_items_table;
mod m20250110_000009_create_routes_table;
mod m20250110_000010_create_route_stops_table;
mod m20250110_000011_create_store_distance_matrix_table;
mod m20250110_000012_create_business_rules_table;
mod m20250110_000013_create_holidays_table;
mod m20250110_000014_create_purchase_failures_table;
mod m20250120_000015_add_planning_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250110_000001_create_staff_table::Migration),
            Box::new(m20250110_000002_create_stores_table::Migration),
            Box::new(m20250110_000003_create_products_table::Migration),
            Box::new(m20250110_000004_create_product_store_mappings_table::Migration),
            Box::new(m20250110_000005_create_orders_table::Migration),
            Box::new(m20250110_000006_create_order_items_table::Migration),
            Box::new(m20250110_000007_create_purchase_lists_table::Migration),
            Box::new(m20250110_000008_create_purchase_list_items_table::Migration),
            Box::new(m20250110_000009_create_routes_table::Migration),
            Box::new(m20250110_000010_create_route_stops_table::Migration),
            Box::new(m20250110_000011_create_store_distance_matrix_table::Migration),
            Box::new(m20250110_000012_create_business_rules_table::Migration),
            Box::new(m20250110_000013_create_holidays_table::Migration),
            Box::new(m20250110_000014_create_purchase_failures_table::Migration),
            Box::new(m20250120_000015_add_planning_indexes::Migration),
        ]
    }
}
