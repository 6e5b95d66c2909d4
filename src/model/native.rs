// src/model/native.rs

use serde::{Serialize, Deserialize};

/// 原生广告素材（CDB 响应中的 `native` 对象）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativeAssets {
    pub products: Vec<NativeProduct>,
    pub advertiser: NativeAdvertiser,
    pub privacy: NativePrivacy,
    #[serde(default)]
    pub impression_pixels: Vec<NativePixel>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativeProduct {
    pub title: String,
    pub description: String,
    pub price: String,
    pub click_url: String,
    pub call_to_action: String,
    pub image: NativeImage,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NativeImage {
    pub url: String,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub width: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativeAdvertiser {
    pub description: String,
    pub domain: String,
    pub logo: NativeImage,
    pub logo_click_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativePrivacy {
    pub optout_click_url: String,
    pub optout_image_url: String,
    #[serde(default)]
    pub long_legal_text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NativePixel {
    pub url: String,
}

impl NativeAssets {
    /// 第一个商品（渲染时的主素材）
    pub fn primary_product(&self) -> Option<&NativeProduct> {
        self.products.first()
    }
}
