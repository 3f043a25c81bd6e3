use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_products_table::Migration),
            Box::new(m20240201_000002_create_transactions_table::Migration),
            Box::new(m20240201_000003_create_leads_table::Migration),
        ]
    }
}

mod m20240201_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Products::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).string())
                        .col(
                            ColumnDef::new(Products::PriceSale)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::PriceOriginal)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::ShippingOptions).json().not_null())
                        .col(ColumnDef::new(Products::OrderBumps).json().not_null())
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        Slug,
        Name,
        Description,
        PriceSale,
        PriceOriginal,
        ShippingOptions,
        OrderBumps,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000002_create_transactions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000002_create_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(Transactions::CustomerName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::CustomerPhone)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::CustomerEmail).string())
                        .col(ColumnDef::new(Transactions::Amount).big_integer().not_null())
                        .col(ColumnDef::new(Transactions::Status).string().not_null())
                        .col(
                            ColumnDef::new(Transactions::PaymentMethod)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::Gateway).string().not_null())
                        .col(ColumnDef::new(Transactions::PixCode).text())
                        .col(ColumnDef::new(Transactions::GatewayTransactionId).string())
                        .col(ColumnDef::new(Transactions::SessionId).uuid())
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_gateway_transaction_id")
                        .table(Transactions::Table)
                        .col(Transactions::GatewayTransactionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_session_id")
                        .table(Transactions::Table)
                        .col(Transactions::SessionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Transactions {
        Table,
        Id,
        ProductId,
        CustomerName,
        CustomerPhone,
        CustomerEmail,
        Amount,
        Status,
        PaymentMethod,
        Gateway,
        PixCode,
        GatewayTransactionId,
        SessionId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000003_create_leads_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000003_create_leads_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Leads::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Leads::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Leads::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Leads::Name).string().not_null())
                        .col(ColumnDef::new(Leads::Phone).string().not_null())
                        .col(ColumnDef::new(Leads::Email).string())
                        .col(
                            ColumnDef::new(Leads::StepAbandoned)
                                .small_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Leads::Recovered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Leads::UtmSource).string())
                        .col(ColumnDef::new(Leads::UtmMedium).string())
                        .col(ColumnDef::new(Leads::UtmCampaign).string())
                        .col(
                            ColumnDef::new(Leads::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Leads::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Leads {
        Table,
        Id,
        ProductId,
        Name,
        Phone,
        Email,
        StepAbandoned,
        Recovered,
        UtmSource,
        UtmMedium,
        UtmCampaign,
        CreatedAt,
    }
}
