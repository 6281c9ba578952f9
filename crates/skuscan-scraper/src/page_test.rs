use super::*;

const NETO_PAGE: &str = r#"<html><head>
<title>Swag Deluxe | Outdoor Co</title>
<meta property="og:title" content="Swag Deluxe &amp; Pillow">
<meta property="og:image" content="/assets/full/SW-1.jpg">
<link rel="canonical" href="/swag-deluxe">
<script type="application/ld+json">
{"@context": "https://schema.org/", "@type": "Product", "name": "Swag Deluxe",
 "sku": "SW-1", "image": ["https://cdn.example.com/sw1.jpg"],
 "offers": {"@type": "Offer", "price": "199.00", "priceCurrency": "AUD",
   "priceSpecification": {"@type": "UnitPriceSpecification",
     "priceType": "https://schema.org/ListPrice", "price": 249.0}}}
</script>
<script type="application/ld+json">
{"@context": "https://schema.org", "@type": "BreadcrumbList", "itemListElement": [
  {"@type": "ListItem", "position": 3, "name": "Swag Deluxe"},
  {"@type": "ListItem", "position": 1, "item": {"@id": "/", "name": "Home"}},
  {"@type": "ListItem", "position": 2, "name": "Swags &amp; Tents"}
]}
</script>
</head><body></body></html>"#;

#[test]
fn parses_jsonld_product_and_breadcrumbs() {
    let data = parse_product_page(NETO_PAGE, "https://shop.example.com/swag-deluxe?x=1");
    assert_eq!(data.name.as_deref(), Some("Swag Deluxe"));
    assert_eq!(data.sku.as_deref(), Some("SW-1"));
    assert_eq!(data.price, Some(Decimal::new(19900, 2)));
    assert_eq!(data.rrp, Some(Decimal::new(249, 0)));
    assert_eq!(data.image_url.as_deref(), Some("https://cdn.example.com/sw1.jpg"));
    assert_eq!(data.breadcrumbs, vec!["Home", "Swags & Tents", "Swag Deluxe"]);
    assert_eq!(data.category.as_deref(), Some("Swags & Tents"));
    assert_eq!(
        data.canonical_url.as_deref(),
        Some("https://shop.example.com/swag-deluxe")
    );
    assert!(data.is_product());
}

#[test]
fn graph_container_and_product_group() {
    let html = r#"<script type="application/ld+json">
    {"@context": "https://schema.org", "@graph": [
      {"@type": "WebPage", "name": "Chair page"},
      {"@type": ["ProductGroup"], "name": "Chair", "productGroupID": 77,
       "category": {"name": "Furniture"},
       "image": {"@type": "ImageObject", "url": "https://cdn.example.com/chair.jpg"},
       "hasVariant": [{"@type": "Product", "sku": "CH-R"}, {"@type": "Product", "productID": "CH-B"}],
       "offers": {"@type": "AggregateOffer", "lowPrice": "49.5", "offers": []}}
    ]}
    </script>"#;
    let data = parse_product_page(html, "https://shop.example.com/product/chair/");
    assert_eq!(data.name.as_deref(), Some("Chair"));
    assert_eq!(data.group_id.as_deref(), Some("77"));
    assert_eq!(data.variant_ids, vec!["CH-R", "CH-B"]);
    assert_eq!(data.category.as_deref(), Some("Furniture"));
    assert_eq!(data.price, Some(Decimal::new(495, 1)));
    assert!(data.sku.is_none());
}

#[test]
fn falls_back_to_microdata_and_og() {
    let html = r#"<html><head>
    <meta property="og:title" content="Camp Stove">
    <meta property="og:image" content="//cdn.example.com/stove.jpg">
    </head><body>
    <ul class="breadcrumb"><li><a href="/">Home</a></li><li><a href="/cooking">Cooking</a></li><li>Camp Stove</li></ul>
    <span itemprop="sku">ST-9</span>
    <meta itemprop="price" content="89.95">
    </body></html>"#;
    let data = parse_product_page(html, "https://shop.example.com/camp-stove");
    assert_eq!(data.name.as_deref(), Some("Camp Stove"));
    assert_eq!(data.sku.as_deref(), Some("ST-9"));
    assert_eq!(data.price, Some(Decimal::new(8995, 2)));
    assert_eq!(data.image_url.as_deref(), Some("https://cdn.example.com/stove.jpg"));
    assert_eq!(data.breadcrumbs, vec!["Home", "Cooking", "Camp Stove"]);
    assert_eq!(data.category.as_deref(), Some("Cooking"));
}

#[test]
fn invalid_jsonld_blocks_are_skipped() {
    let html = r#"<script type="application/ld+json">{not json</script>
    <script type="application/ld+json">[{"@type": "Product", "name": "Lamp", "sku": 1234}]</script>"#;
    let data = parse_product_page(html, "https://shop.example.com/lamp");
    assert_eq!(data.name.as_deref(), Some("Lamp"));
    assert_eq!(data.sku.as_deref(), Some("1234"));
}

#[test]
fn listing_page_is_not_a_product() {
    let html = "<html><head><title>Search results</title></head><body><h1>Results</h1></body></html>";
    let data = parse_product_page(html, "https://shop.example.com/?rf=kw&kw=x");
    assert!(!data.is_product());
    assert_eq!(data.name.as_deref(), Some("Results"));
}

#[test]
fn parse_price_text_formats() {
    assert_eq!(parse_price_text("$1,299.95"), Some(Decimal::new(129_995, 2)));
    assert_eq!(parse_price_text("AU$ 12"), Some(Decimal::new(12, 0)));
    assert_eq!(parse_price_text("12,50 €"), Some(Decimal::new(1250, 2)));
    assert_eq!(parse_price_text("1.299,95"), Some(Decimal::new(129_995, 2)));
    assert_eq!(parse_price_text("RRP $49.00."), Some(Decimal::new(4900, 2)));
    assert_eq!(parse_price_text("Call for price"), None);
}

#[test]
fn decode_entities_named_and_numeric() {
    assert_eq!(decode_entities("Tom &amp; Jerry&#39;s &#x41;"), "Tom & Jerry's A");
    assert_eq!(decode_entities("&bogus; stays"), "&bogus; stays");
}

#[test]
fn anchor_hrefs_collects_and_decodes() {
    let html = r#"<a href="/a?x=1&amp;y=2">A</a><a class="c" href='/b'>B</a><a name="top">"#;
    assert_eq!(anchor_hrefs(html), vec!["/a?x=1&y=2", "/b"]);
}

#[test]
fn extract_attr_ignores_prefixed_names() {
    let tag = r#"<div data-content="no" content="yes">"#;
    assert_eq!(extract_attr(tag, "content").as_deref(), Some("yes"));
}

#[test]
fn extract_attr_matches_names_case_insensitively() {
    let tag = r#"<input type="hidden" NAME='add-to-cart' Value=" 42 " data-x="a=b">"#;
    assert_eq!(extract_attr(tag, "name").as_deref(), Some("add-to-cart"));
    assert_eq!(extract_attr(tag, "value").as_deref(), Some("42"));
    assert_eq!(extract_attr(tag, "data-x").as_deref(), Some("a=b"));
    assert!(extract_attr(tag, "id").is_none());
}
