use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use webshop_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    domain::{Brand, Country, DiscountCode, catalog::validate_listing},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    middleware::auth::{ADMIN_ROLE, CUSTOMER_ROLE},
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin12345", ADMIN_ROLE).await?;
    let user_id = ensure_user(&orm, "user@example.com", "user12345", CUSTOMER_ROLE).await?;
    seed_products(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(orm: &OrmConn, email: &str, password: &str, role: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        let id = existing.id;
        let mut active: UserActive = existing.into();
        active.role = Set(role.to_string());
        active.update(orm).await?;
        println!("Ensured user {email} (role={role})");
        return Ok(id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Created user {email} (role={role})");
    Ok(user.id)
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<()> {
    let products = [
        ("Fjord Floor Lamp", Brand::Northwind, Country::Norway, 160, Decimal::new(129900, 2), "Brushed steel, warm light", 12, DiscountCode::NoDiscount),
        ("Birch Side Table", Brand::Acme, Country::Sweden, 55, Decimal::new(49900, 2), "Solid birch, oiled", 30, DiscountCode::ThreeForTwo),
        ("Wool Throw", Brand::Contoso, Country::Denmark, 2, Decimal::new(34950, 2), "Lambswool, 130x170", 80, DiscountCode::TwoForOne),
        ("Pine Bookshelf", Brand::Fabrikam, Country::Finland, 190, Decimal::new(189000, 2), "Five shelves, untreated pine", 6, DiscountCode::FiftyPercent),
        ("Ceramic Vase", Brand::Other, Country::Germany, 30, Decimal::new(19900, 2), "Hand glazed", 45, DiscountCode::TwentyPercent),
        ("Oak Stool", Brand::Acme, Country::Other, 45, Decimal::new(79900, 2), "Stackable", 20, DiscountCode::FivePercent),
    ];

    let mut inserted = 0;
    for (name, brand, country, height, price, description, stock, discount) in products {
        validate_listing(name, description, price, height, stock)?;
        inserted += Products::insert(ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            brand: Set(brand),
            country: Set(country),
            height: Set(height),
            price: Set(price),
            description: Set(description.to_string()),
            stock: Set(stock),
            discount: Set(discount),
            created_at: Set(Utc::now().into()),
        })
        .on_conflict(OnConflict::column(ProdCol::Name).do_nothing().to_owned())
        .exec_without_returning(orm)
        .await?;
    }

    println!("Seeded {inserted} products");
    Ok(())
}
