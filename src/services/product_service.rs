use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    domain::{CatalogRegistry, ProductKind, ProductRef, catalog::validate_listing},
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Loads the catalog records behind `refs`, one query per product kind.
pub async fn load_registry<C: ConnectionTrait>(
    conn: &C,
    refs: &[ProductRef],
) -> AppResult<CatalogRegistry> {
    let mut registry = CatalogRegistry::new();

    let mut product_ids = Vec::new();
    for product in refs {
        match product.kind {
            ProductKind::Product => product_ids.push(product.id),
        }
    }

    if !product_ids.is_empty() {
        let models = Products::find()
            .filter(Column::Id.is_in(product_ids))
            .all(conn)
            .await?;
        for model in models {
            registry.insert(model.into());
        }
    }

    Ok(registry)
}

/// Names are unique across the catalog; `except` skips the entry being edited.
async fn ensure_name_free<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Products::find().filter(Column::Name.eq(name.trim()));
    if let Some(id) = except {
        finder = finder.filter(Column::Id.ne(id));
    }
    if finder.one(conn).await?.is_some() {
        return Err(AppError::BadRequest("Product name is already taken".into()));
    }
    Ok(())
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }
    if let Some(brand) = query.brand {
        condition = condition.add(Column::Brand.eq(brand));
    }
    if let Some(country) = query.country {
        condition = condition.add(Column::Country.eq(country));
    }
    if let Some(discount) = query.discount {
        condition = condition.add(Column::Discount.eq(discount));
    }

    let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
        ProductSortBy::Height => Column::Height,
    };

    let mut finder = Products::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await?;

    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let model = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", Product::try_from(model)?, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_listing(
        &payload.name,
        &payload.description,
        payload.price,
        payload.height,
        payload.stock,
    )?;
    ensure_name_free(&state.orm, &payload.name, None).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        brand: Set(payload.brand),
        country: Set(payload.country),
        height: Set(payload.height),
        price: Set(payload.price),
        description: Set(payload.description),
        stock: Set(payload.stock),
        discount: Set(payload.discount),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        product_id = %product.id,
        discount = product.discount.label(),
        "catalog entry created"
    );

    Ok(ApiResponse::success(
        "Product created",
        Product::try_from(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let name = payload.name.unwrap_or_else(|| existing.name.clone());
    let price = payload.price.unwrap_or(existing.price);
    let height = payload.height.unwrap_or(existing.height);
    let stock = payload.stock.unwrap_or(existing.stock);
    let description = payload
        .description
        .unwrap_or_else(|| existing.description.clone());
    validate_listing(&name, &description, price, height, stock)?;
    ensure_name_free(&state.orm, &name, Some(id)).await?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name.trim().to_string());
    active.price = Set(price);
    active.height = Set(height);
    active.stock = Set(stock);
    active.description = Set(description);
    if let Some(brand) = payload.brand {
        active.brand = Set(brand);
    }
    if let Some(country) = payload.country {
        active.country = Set(country);
    }
    if let Some(discount) = payload.discount {
        active.discount = Set(discount);
    }

    let product = active.update(&state.orm).await?;
    tracing::info!(product_id = %product.id, "catalog entry updated");

    Ok(ApiResponse::success(
        "Updated",
        Product::try_from(product)?,
        Some(Meta::empty()),
    ))
}

/// Deletes an entry along with any cart lines still pointing at it.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let result = Products::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let lines = CartItems::delete_many()
        .filter(CartItemCol::ProductKind.eq(ProductKind::Product))
        .filter(CartItemCol::ProductId.eq(id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    tracing::info!(
        product_id = %id,
        cart_lines = lines.rows_affected,
        "catalog entry deleted"
    );

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
