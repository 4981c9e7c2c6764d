use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20250301_000001_create_material_batches_table::Migration,
        )]
    }
}

mod m20250301_000001_create_material_batches_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_material_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MaterialBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaterialBatches::BatchId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialBatches::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(MaterialBatches::MaterialTypeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::SupplierId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::InboundQuantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::RemainingQuantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::ReservedQuantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::UsedQuantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::TotalCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::InboundDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialBatches::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(MaterialBatches::ProductionDate)
                                .date()
                                .null(),
                        )
                        .col(ColumnDef::new(MaterialBatches::Status).string().not_null())
                        .col(
                            ColumnDef::new(MaterialBatches::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialBatches::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Candidate lookups are always tenant + material scoped
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_material_batches_tenant_material")
                        .table(MaterialBatches::Table)
                        .col(MaterialBatches::TenantId)
                        .col(MaterialBatches::MaterialTypeId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_material_batches_tenant_status")
                        .table(MaterialBatches::Table)
                        .col(MaterialBatches::TenantId)
                        .col(MaterialBatches::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_material_batches_inbound_date")
                        .table(MaterialBatches::Table)
                        .col(MaterialBatches::InboundDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaterialBatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum MaterialBatches {
        Table,
        BatchId,
        TenantId,
        MaterialTypeId,
        SupplierId,
        InboundQuantity,
        RemainingQuantity,
        ReservedQuantity,
        UsedQuantity,
        UnitPrice,
        TotalCost,
        InboundDate,
        ExpiryDate,
        ProductionDate,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}
