use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    TenantId,
    CompanyId,
    Supplier,
    Status,
    TotalCost,
    CreatedBy,
    ConfirmedBy,
    ConfirmedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PurchaseItems {
    Table,
    Id,
    PurchaseId,
    IngredientId,
    Quantity,
    UnitCost,
    TotalCost,
}

#[derive(DeriveIden)]
enum Ingredients {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("purchase_status"))
                    .values(vec![
                        Alias::new("pending"),
                        Alias::new("confirmed"),
                        Alias::new("cancelled"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Purchases::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Purchases::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Purchases::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Purchases::Supplier).string_len(255).null())
                    .col(
                        ColumnDef::new(Purchases::Status)
                            .custom(Alias::new("purchase_status"))
                            .not_null()
                            .default(Expr::cust("'pending'::purchase_status")),
                    )
                    .col(
                        ColumnDef::new(Purchases::TotalCost)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Purchases::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Purchases::ConfirmedBy).uuid().null())
                    .col(
                        ColumnDef::new(Purchases::ConfirmedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Purchases::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseItems::PurchaseId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseItems::IngredientId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseItems::Quantity).double().not_null())
                    .col(ColumnDef::new(PurchaseItems::UnitCost).double().not_null())
                    .col(ColumnDef::new(PurchaseItems::TotalCost).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_items_purchase")
                            .from(PurchaseItems::Table, PurchaseItems::PurchaseId)
                            .to(Purchases::Table, Purchases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_items_ingredient")
                            .from(PurchaseItems::Table, PurchaseItems::IngredientId)
                            .to(Ingredients::Table, Ingredients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(PurchaseItems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_type(
                Type::drop()
                    .if_exists()
                    .name(Alias::new("purchase_status"))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
