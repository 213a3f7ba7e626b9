use crate::models::{NormalizedProduct, ProductDraft};

pub fn normalize(draft: &ProductDraft) -> NormalizedProduct {
    NormalizedProduct {
        title: draft.title.clone(),
        category: draft.category.clone(),
        price: draft.price.clone(),
        currency: draft.currency.clone(),
        unit: draft.unit.clone(),
        stock: draft.stock.clone(),
        min_order_qty: draft.min_order_qty.clone(),
        keywords: split_list(&draft.keywords, ','),
        image_urls: split_list(&draft.image_urls, '\n'),
        short_description: draft.short_description.clone(),
        description: draft.description.clone(),
        features: split_list(&draft.features, '\n'),
        packaging: draft.packaging.clone(),
        lead_time: draft.lead_time.clone(),
    }
}

/// Splits on `separator`, trims each piece and drops the empty ones.
pub fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explodes_list_fields_in_order() {
        let draft = ProductDraft {
            title: "Copper wire".into(),
            keywords: " wire, copper ,, 16awg ".into(),
            image_urls: "https://cdn.test/a.jpg\n\n  https://cdn.test/b.jpg  \r\n".into(),
            features: "Flexible\n  \nHeat resistant".into(),
            ..ProductDraft::default()
        };
        let product = normalize(&draft);
        assert_eq!(product.keywords, vec!["wire", "copper", "16awg"]);
        assert_eq!(
            product.image_urls,
            vec!["https://cdn.test/a.jpg", "https://cdn.test/b.jpg"]
        );
        assert_eq!(product.features, vec!["Flexible", "Heat resistant"]);
        assert_eq!(product.title, "Copper wire");
    }

    #[test]
    fn empty_fields_become_empty_lists() {
        let product = normalize(&ProductDraft::default());
        assert!(product.keywords.is_empty());
        assert!(product.image_urls.is_empty());
        assert!(product.features.is_empty());
    }

    #[test]
    fn keywords_are_not_split_on_newline() {
        let product = normalize(&ProductDraft {
            keywords: "a\nb,c".into(),
            ..ProductDraft::default()
        });
        assert_eq!(product.keywords, vec!["a\nb", "c"]);
    }
}
