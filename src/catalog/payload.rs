use crate::catalog::config::{DEFAULT_CURRENCY, MAX_IMAGES};
use crate::models::NormalizedProduct;
use crate::settings::AgentSettings;
use serde::Serialize;

/// Body of one catalogue upload. Every value travels as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CatalogPayload {
    pub product_name: String,
    pub seller_id: String,
    pub currency_type: String,
    pub your_price: String,
    pub unit: String,
    pub min_order_quantity: String,
    pub package_details: String,
    pub supply_ability: String,
    pub delivery_time: String,
    pub short_desc: String,
    pub long_desc: String,
    pub key_features: String,
    pub keywords: String,
    #[serde(rename = "IMAGE1")]
    pub image1: String,
    #[serde(rename = "IMAGE2")]
    pub image2: String,
    #[serde(rename = "IMAGE3")]
    pub image3: String,
    pub category: String,
}

impl CatalogPayload {
    pub fn build(product: &NormalizedProduct, settings: &AgentSettings) -> Self {
        let mut images = product
            .image_urls
            .iter()
            .take(MAX_IMAGES)
            .cloned()
            .chain(std::iter::repeat(String::new()));
        let currency = product.currency.trim();

        Self {
            product_name: product.title.clone(),
            seller_id: settings.seller_id.clone(),
            currency_type: if currency.is_empty() {
                DEFAULT_CURRENCY.to_string()
            } else {
                currency.to_string()
            },
            your_price: product.price.clone(),
            unit: product.unit.clone(),
            min_order_quantity: product.min_order_qty.clone(),
            package_details: product.packaging.clone(),
            supply_ability: product.stock.clone(),
            delivery_time: product.lead_time.clone(),
            short_desc: product.short_description.clone(),
            long_desc: product.description.clone(),
            key_features: product.features.join("|"),
            keywords: product.keywords.join(","),
            image1: images.next().unwrap_or_default(),
            image2: images.next().unwrap_or_default(),
            image3: images.next().unwrap_or_default(),
            category: product.category.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product() -> NormalizedProduct {
        NormalizedProduct {
            title: "Copper wire".into(),
            category: "Electrical".into(),
            price: "10".into(),
            unit: "metre".into(),
            stock: "500 per week".into(),
            min_order_qty: "50".into(),
            keywords: vec!["wire".into(), "copper".into()],
            image_urls: vec![
                "https://cdn.test/1.jpg".into(),
                "https://cdn.test/2.jpg".into(),
                "https://cdn.test/3.jpg".into(),
                "https://cdn.test/4.jpg".into(),
            ],
            short_description: "16 AWG".into(),
            description: "Flexible copper wire".into(),
            features: vec!["Flexible".into(), "PVC insulated".into()],
            packaging: "Coil".into(),
            lead_time: "2 days".into(),
            ..NormalizedProduct::default()
        }
    }

    #[test]
    fn maps_fields_to_wire_names() {
        let settings = AgentSettings {
            seller_id: "SELLER-9".into(),
            ..AgentSettings::default()
        };
        let value = serde_json::to_value(CatalogPayload::build(&product(), &settings)).unwrap();
        assert_eq!(
            value,
            json!({
                "PRODUCT_NAME": "Copper wire",
                "SELLER_ID": "SELLER-9",
                "CURRENCY_TYPE": "INR",
                "YOUR_PRICE": "10",
                "UNIT": "metre",
                "MIN_ORDER_QUANTITY": "50",
                "PACKAGE_DETAILS": "Coil",
                "SUPPLY_ABILITY": "500 per week",
                "DELIVERY_TIME": "2 days",
                "SHORT_DESC": "16 AWG",
                "LONG_DESC": "Flexible copper wire",
                "KEY_FEATURES": "Flexible|PVC insulated",
                "KEYWORDS": "wire,copper",
                "IMAGE1": "https://cdn.test/1.jpg",
                "IMAGE2": "https://cdn.test/2.jpg",
                "IMAGE3": "https://cdn.test/3.jpg",
                "CATEGORY": "Electrical",
            })
        );
    }

    #[test]
    fn pads_missing_images_and_keeps_explicit_currency() {
        let mut item = product();
        item.image_urls.truncate(1);
        item.currency = "USD".into();
        let payload = CatalogPayload::build(&item, &AgentSettings::default());
        assert_eq!(payload.image1, "https://cdn.test/1.jpg");
        assert_eq!(payload.image2, "");
        assert_eq!(payload.image3, "");
        assert_eq!(payload.currency_type, "USD");
    }
}
