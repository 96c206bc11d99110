mod accessor_properties;
mod markup_properties;
