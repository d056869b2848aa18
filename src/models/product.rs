use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single labelled row of the specification table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Specification {
    pub label: String,
    pub value: String,
}

/// The product showcased by the storefront.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[schema(example = "Premium Smartphone Pro Max")]
    pub name: String,
    #[schema(example = 899.99)]
    pub price: f64,
    /// List price before the discount
    #[schema(example = 1099.99)]
    pub original_price: f64,
    pub rating: f64,
    pub reviews: u32,
    pub in_stock: bool,
    pub description: String,
    pub features: Vec<String>,
    pub specifications: Vec<Specification>,
}

impl Product {
    /// The storefront's flagship phone.
    pub fn showcase() -> Self {
        let specifications = [
            ("Display", "6.7-inch AMOLED, 120Hz"),
            ("Processor", "Latest Gen Flagship Chip"),
            ("RAM", "12GB LPDDR5"),
            ("Storage", "256GB UFS 4.0"),
            ("Battery", "4500mAh with 65W charging"),
            ("Camera", "48MP + 12MP + 12MP"),
            ("Weight", "215g"),
            ("Colors", "Midnight Black, Silver, Gold"),
        ]
        .into_iter()
        .map(|(label, value)| Specification {
            label: label.to_string(),
            value: value.to_string(),
        })
        .collect();

        Self {
            name: "Premium Smartphone Pro Max".to_string(),
            price: 899.99,
            original_price: 1099.99,
            rating: 4.9,
            reviews: 2847,
            in_stock: true,
            description: "Experience cutting-edge technology with our Premium Smartphone Pro Max. \
                Featuring a stunning 6.7-inch AMOLED display, advanced triple camera system, and \
                lightning-fast 5G connectivity. Engineered for performance and designed for excellence."
                .to_string(),
            features: [
                "6.7-inch AMOLED display with 120Hz refresh rate",
                "Advanced triple camera system (48MP + 12MP + 12MP)",
                "5G connectivity with WiFi 6E",
                "All-day battery life with fast charging",
                "IP68 water and dust resistance",
                "Premium aluminum and glass design",
                "Wireless charging and reverse wireless charging",
                "Advanced facial recognition and fingerprint sensor",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            specifications,
        }
    }

    /// Discount against the list price, in whole percent.
    pub fn savings_percent(&self) -> u32 {
        if self.original_price <= 0.0 || self.price >= self.original_price {
            return 0;
        }
        ((1.0 - self.price / self.original_price) * 100.0).round() as u32
    }
}

/// Wire representation with derived fields included.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    #[schema(example = 18)]
    pub savings_percent: u32,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            savings_percent: product.savings_percent(),
            product: product.clone(),
        }
    }
}
