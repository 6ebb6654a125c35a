//! CPU: identifikasi prosesor saat boot

use raw_cpuid::CpuId;

pub fn init() {
    let cpuid = CpuId::new();
    if let Some(vendor) = cpuid.get_vendor_info() {
        klog!("CPU: {}", vendor.as_str());
    }
    if let Some(brand) = cpuid.get_processor_brand_string() {
        klog!("CPU: {}", brand.as_str().trim());
    }
}
