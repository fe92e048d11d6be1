//! Catalog service for warehouses and products

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::DynStore;
use shared::{validate_weight, Product, Warehouse};

/// Catalog service managing warehouses and the product master data
#[derive(Clone)]
pub struct CatalogService {
    store: DynStore,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarehouseInput {
    #[validate(length(min = 1, max = 500))]
    pub address: String,
}

/// Input for creating or replacing a product
#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub characteristics: Option<serde_json::Value>,
    #[serde(default)]
    pub weight: Decimal,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub barcode: String,
}

impl ProductInput {
    fn into_product(self, id: Uuid) -> AppResult<Product> {
        self.validate()?;
        validate_weight(self.weight).map_err(|msg| AppError::validation("weight", msg))?;

        let mut product = Product::new(self.name.trim());
        product.id = id;
        product.description = self.description;
        if let Some(characteristics) = self.characteristics {
            if !characteristics.is_object() {
                return Err(AppError::validation(
                    "characteristics",
                    "Characteristics must be a JSON object",
                ));
            }
            product.characteristics = characteristics;
        }
        product.weight = self.weight;
        product.barcode = self.barcode;
        Ok(product)
    }
}

impl CatalogService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn create_warehouse(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;
        let address = input.address.trim();
        if address.is_empty() {
            return Err(AppError::validation("address", "Address is required"));
        }

        let warehouse = self.store.create_warehouse(Warehouse::new(address)).await?;
        tracing::info!(warehouse_id = %warehouse.id, "warehouse created");
        Ok(warehouse)
    }

    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        self.store.list_warehouses().await
    }

    pub async fn get_warehouse(&self, id: Uuid) -> AppResult<Warehouse> {
        self.store
            .get_warehouse(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    pub async fn create_product(&self, input: ProductInput) -> AppResult<Product> {
        let product = input.into_product(Uuid::new_v4())?;
        if product.name.is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }

        let product = self.store.create_product(product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        self.store.list_products().await
    }

    pub async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Replace all attributes of an existing product
    pub async fn update_product(&self, id: Uuid, input: ProductInput) -> AppResult<Product> {
        let product = input.into_product(id)?;
        if product.name.is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }

        self.store
            .update_product(product)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::new()))
    }

    fn product_input(name: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: String::new(),
            characteristics: None,
            weight: Decimal::ONE,
            barcode: String::new(),
        }
    }

    #[tokio::test]
    async fn test_blank_address_rejected() {
        let err = service()
            .create_warehouse(CreateWarehouseInput {
                address: "   ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_warehouses_listed_by_address() {
        let service = service();
        for address in ["Zeta road 9", "Alpha road 1"] {
            service
                .create_warehouse(CreateWarehouseInput {
                    address: address.to_string(),
                })
                .await
                .unwrap();
        }
        let listed = service.list_warehouses().await.unwrap();
        assert_eq!(listed[0].address, "Alpha road 1");
    }

    #[tokio::test]
    async fn test_negative_weight_rejected() {
        let mut input = product_input("Scale");
        input.weight = Decimal::NEGATIVE_ONE;
        let err = service().create_product(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "weight"));
    }

    #[tokio::test]
    async fn test_update_product() {
        let service = service();
        let created = service.create_product(product_input("Lamp")).await.unwrap();

        let mut input = product_input("Desk lamp");
        input.characteristics = Some(serde_json::json!({ "color": "black" }));
        let updated = service.update_product(created.id, input).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Desk lamp");
        assert_eq!(service.get_product(created.id).await.unwrap(), updated);

        let missing = service
            .update_product(Uuid::new_v4(), product_input("Ghost"))
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }
}
