//! # Catalog Commands
//!
//! Product listing for every logged-in user; creation, edits and removal
//! for admins only.

use tracing::{debug, info};

use caja_core::validation::{validate_product_draft, validate_uuid};
use caja_core::{Product, ProductDraft, Transaction};

use crate::commands::auth::require_admin;
use crate::error::ApiError;
use crate::state::{DbState, SessionState};

/// Lists the catalog ordered by name.
pub async fn list_products(db: &DbState, session: &SessionState) -> Result<Vec<Product>, ApiError> {
    session.require_user()?;
    Ok(db.inner().products().list().await?)
}

/// Gets one product.
pub async fn get_product(
    db: &DbState,
    session: &SessionState,
    id: &str,
) -> Result<Product, ApiError> {
    session.require_user()?;

    db.inner()
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))
}

/// Adds a product to the catalog.
pub async fn create_product(
    db: &DbState,
    session: &SessionState,
    draft: ProductDraft,
) -> Result<Product, ApiError> {
    debug!(name = %draft.name, "create_product");

    require_admin(session)?;
    validate_product_draft(&draft)?;

    let product = db.inner().products().insert(&draft).await?;

    info!(id = %product.id, name = %product.name, "Product created");
    Ok(product)
}

/// Replaces a product's name, prices and stock.
pub async fn update_product(
    db: &DbState,
    session: &SessionState,
    id: &str,
    draft: ProductDraft,
) -> Result<Product, ApiError> {
    debug!(id = %id, "update_product");

    require_admin(session)?;
    validate_uuid(id)?;
    validate_product_draft(&draft)?;

    let products = db.inner().products();
    products.update(id, &draft).await?;

    let product = products
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    info!(id = %product.id, "Product updated");
    Ok(product)
}

/// Removes a product. Its posted transactions are kept.
pub async fn delete_product(db: &DbState, session: &SessionState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_product");

    require_admin(session)?;
    db.inner().products().delete(id).await?;

    info!(id = %id, "Product deleted");
    Ok(())
}

/// Every transaction posted for a product, oldest first.
pub async fn product_history(
    db: &DbState,
    session: &SessionState,
    id: &str,
) -> Result<Vec<Transaction>, ApiError> {
    require_admin(session)?;
    Ok(db.inner().transactions().list_for_product(id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use caja_core::{Money, Quantity, Role, User};
    use caja_db::{Database, DbConfig};

    async fn setup(role: Role) -> (DbState, SessionState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = SessionState::new();
        session.sign_in(
            User {
                id: "u1".to_string(),
                username: "someone".to_string(),
                password: String::new(),
                role,
                branch_id: None,
            },
            None,
        );
        (DbState::new(db), session)
    }

    fn draft(name: &str) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            buy_price: Money::from_pesos(700),
            sell_price: Money::from_pesos(1200),
            stock: Quantity::from_units(24),
        }
    }

    #[tokio::test]
    async fn test_admin_manages_catalog() {
        let (db, session) = setup(Role::Admin).await;

        let created = create_product(&db, &session, draft("Leche")).await.unwrap();
        create_product(&db, &session, draft("Arroz")).await.unwrap();

        let names: Vec<String> = list_products(&db, &session)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Arroz", "Leche"]);

        let mut edit = draft("Leche entera");
        edit.sell_price = Money::from_pesos(1300);
        let updated = update_product(&db, &session, &created.id, edit).await.unwrap();
        assert_eq!(updated.name, "Leche entera");
        assert_eq!(updated.sell_price.pesos(), 1300);

        assert!(product_history(&db, &session, &created.id).await.unwrap().is_empty());

        delete_product(&db, &session, &created.id).await.unwrap();
        let err = get_product(&db, &session, &created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_seller_can_list_but_not_edit() {
        let (db, session) = setup(Role::Seller).await;

        assert!(list_products(&db, &session).await.unwrap().is_empty());
        let err = create_product(&db, &session, draft("Leche")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_invalid_product_is_rejected() {
        let (db, session) = setup(Role::Admin).await;

        let err = create_product(&db, &session, draft("  ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let mut negative = draft("Azúcar");
        negative.stock = Quantity::from_units(-1);
        let err = create_product(&db, &session, negative).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
