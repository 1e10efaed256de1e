//! Property tests for translator dirty tracking
//!
//! Dirtiness is defined against the captured baseline, not against edit
//! history: any mutation sequence that ends with every field back at its
//! baseline value must leave the variant clean.

use proptest::prelude::*;

use cadpack::models::{ImageFormat, StepProtocol};
use cadpack::translators::{Translator, TranslatorKind};

fn suffix_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{0,6}"
}

proptest! {
    #[test]
    fn suffix_sequence_ending_at_baseline_is_clean(values in prop::collection::vec(suffix_strategy(), 0..10)) {
        let mut translator = Translator::new(TranslatorKind::Pdf);
        for value in &values {
            translator.set_file_name_suffix(value);
        }
        translator.set_file_name_suffix("");
        prop_assert!(!translator.is_changed());
        prop_assert!(!translator.has_errors());
    }

    #[test]
    fn bool_toggle_parity_decides_dirtiness(toggles in 0usize..8) {
        let mut translator = Translator::new(TranslatorKind::Pdf);
        let mut value = false;
        for _ in 0..toggles {
            value = !value;
            translator.set_single_document(value);
        }
        prop_assert_eq!(translator.is_changed(), value);
    }

    #[test]
    fn mixed_edits_reverted_in_any_order_are_clean(
        protocol in prop::sample::select(vec![StepProtocol::Ap203, StepProtocol::Ap242]),
        suffix in suffix_strategy(),
        revert_suffix_first in any::<bool>(),
    ) {
        let mut translator = Translator::new(TranslatorKind::Step);
        translator.set_step_protocol(protocol);
        translator.set_file_name_suffix(&suffix);

        if revert_suffix_first {
            translator.set_file_name_suffix("");
            translator.set_step_protocol(StepProtocol::Ap214);
        } else {
            translator.set_step_protocol(StepProtocol::Ap214);
            translator.set_file_name_suffix("");
        }
        prop_assert!(!translator.is_changed());
    }

    #[test]
    fn hydration_order_is_irrelevant(shuffle in any::<bool>()) {
        let mut source = Translator::new(TranslatorKind::Bitmap);
        source.set_image_format(ImageFormat::Tiff);
        source.set_screen_layers(true);
        source.set_file_name_suffix("_img");

        let mut params: Vec<(String, String)> = source
            .parameters()
            .into_iter()
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        if shuffle {
            params.reverse();
        }

        let mut restored = Translator::new(TranslatorKind::Bitmap);
        restored.hydrate(&params);
        prop_assert_eq!(restored.parameters(), source.parameters());
    }
}
