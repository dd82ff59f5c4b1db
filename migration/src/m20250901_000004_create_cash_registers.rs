use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveIden)]
enum CashRegisters {
    Table,
    Id,
    TenantId,
    CompanyId,
    Status,
    OpenedBy,
    ClosedBy,
    OpeningBalance,
    ExpectedBalance,
    ClosingBalance,
    BalanceDifference,
    Notes,
    OpenedAt,
    ClosedAt,
    CreatedAt,
    UpdatedAt,
}

/// 收银流水（只追加）
#[derive(DeriveIden)]
enum CashMovements {
    Table,
    Id,
    TenantId,
    CompanyId,
    CashRegisterId,
    MovementType,
    Amount,
    PreviousBalance,
    NewBalance,
    Description,
    OrderId,
    PaymentId,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("cash_register_status"))
                    .values(vec![Alias::new("open"), Alias::new("closed")])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("cash_movement_type"))
                    .values(vec![
                        Alias::new("opening"),
                        Alias::new("closing"),
                        Alias::new("sale"),
                        Alias::new("refund"),
                        Alias::new("withdrawal"),
                        Alias::new("deposit"),
                        Alias::new("expense"),
                        Alias::new("adjustment"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CashRegisters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashRegisters::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CashRegisters::TenantId).uuid().not_null())
                    .col(ColumnDef::new(CashRegisters::CompanyId).uuid().not_null())
                    .col(
                        ColumnDef::new(CashRegisters::Status)
                            .custom(Alias::new("cash_register_status"))
                            .not_null()
                            .default(Expr::cust("'open'::cash_register_status")),
                    )
                    .col(ColumnDef::new(CashRegisters::OpenedBy).uuid().not_null())
                    .col(ColumnDef::new(CashRegisters::ClosedBy).uuid().null())
                    .col(
                        ColumnDef::new(CashRegisters::OpeningBalance)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::ExpectedBalance)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(CashRegisters::ClosingBalance).double().null())
                    .col(
                        ColumnDef::new(CashRegisters::BalanceDifference)
                            .double()
                            .null(),
                    )
                    .col(ColumnDef::new(CashRegisters::Notes).text().null())
                    .col(
                        ColumnDef::new(CashRegisters::OpenedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个 (tenant, company) 同时最多一个 open 收银台
        let conn = manager.get_connection();
        conn.execute_raw(Statement::from_string(
            manager.get_database_backend(),
            r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_cash_registers_single_open
               ON cash_registers (tenant_id, company_id)
               WHERE status = 'open'"#
                .to_string(),
        ))
        .await?;

        manager
            .create_table(
                Table::create()
                    .table(CashMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashMovements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CashMovements::TenantId).uuid().not_null())
                    .col(ColumnDef::new(CashMovements::CompanyId).uuid().not_null())
                    .col(
                        ColumnDef::new(CashMovements::CashRegisterId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CashMovements::MovementType)
                            .custom(Alias::new("cash_movement_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashMovements::Amount).double().not_null())
                    .col(
                        ColumnDef::new(CashMovements::PreviousBalance)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashMovements::NewBalance).double().not_null())
                    .col(ColumnDef::new(CashMovements::Description).text().null())
                    .col(ColumnDef::new(CashMovements::OrderId).uuid().null())
                    .col(ColumnDef::new(CashMovements::PaymentId).uuid().null())
                    .col(ColumnDef::new(CashMovements::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(CashMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cash_movements_register")
                            .from(CashMovements::Table, CashMovements::CashRegisterId)
                            .to(CashRegisters::Table, CashRegisters::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_cash_movements_register_created")
                    .table(CashMovements::Table)
                    .col(CashMovements::CashRegisterId)
                    .col(CashMovements::CreatedAt)
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
                    .table(CashMovements::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(CashRegisters::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_type(
                Type::drop()
                    .if_exists()
                    .name(Alias::new("cash_movement_type"))
                    .to_owned(),
            )
            .await?;
        manager
            .drop_type(
                Type::drop()
                    .if_exists()
                    .name(Alias::new("cash_register_status"))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
