use serde::{Deserialize, Serialize};

/// Declares a feature record with one `String` per field and an exact-arity
/// `from_fields` constructor.
macro_rules! feature_record {
    ($(#[$meta:meta])* $name:ident { $($field:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $(pub $field: String,)+
        }

        impl $name {
            pub const ARITY: usize = [$(stringify!($field)),+].len();

            /// Build the record, or `None` unless there are exactly
            /// [`ARITY`](Self::ARITY) fields.
            pub fn from_fields(fields: &[String]) -> Option<Self> {
                if fields.len() != Self::ARITY {
                    return None;
                }
                let mut fields = fields.iter().cloned();
                Some(Self {
                    $($field: fields.next()?,)+
                })
            }
        }
    };
}

feature_record! {
    /// Feature layout of UniDic 2.1.2
    UnidicFeature26 {
        pos1, pos2, pos3, pos4,
        c_type, c_form, l_form, lemma, orth, pron, orth_base, pron_base,
        goshu, i_type, i_form, f_type, f_form,
        kana, kana_base, form, form_base,
        i_con_type, f_con_type, a_type, a_con_type, a_mod_type,
    }
}

feature_record! {
    /// Feature layout of UniDic 3.x
    UnidicFeature29 {
        pos1, pos2, pos3, pos4,
        c_type, c_form, l_form, lemma, orth, pron, orth_base, pron_base,
        goshu, i_type, i_form, f_type, f_form,
        i_con_type, f_con_type, r#type,
        kana, kana_base, form, form_base,
        a_type, a_con_type, a_mod_type, lid, lemma_id,
    }
}
